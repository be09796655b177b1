use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes the tracing subscriber. Logs always go to stderr: stdout may
/// carry the dump itself and nothing is allowed to interleave with it.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .init();
}
