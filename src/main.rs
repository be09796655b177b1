use clap::Parser;

use waypost::cli::{self, Cli, Commands};
use waypost::logging;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();
    let args = Cli::parse();
    match args.command {
        Commands::Index(index_args) => cli::index::run(index_args)?,
        Commands::Check { dump } => cli::check::run(&dump)?,
    }
    Ok(())
}
