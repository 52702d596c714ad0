use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage error: {0}")]
    Storage(#[from] rocksdb::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("invalid row: {0}")]
    Validation(String),
    #[error("internal error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
