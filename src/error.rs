use thiserror::Error;

#[derive(Error, Debug)]
pub enum WaypostError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("invalid workspace snapshot: {0}")]
    Snapshot(String),
    #[error("project reference cycle involving: {0}")]
    ProjectCycle(String),
    #[error("invalid dump: {0}")]
    InvalidDump(String),
}

pub type Result<T> = std::result::Result<T, WaypostError>;
