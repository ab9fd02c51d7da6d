use thiserror::Error;

pub type Result<T> = std::result::Result<T, MetadataError>;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Storage backend error: {0}")]
    StorageError(#[from] mongodb::error::Error),

    #[error("Malformed job record: {0}")]
    MalformedRecord(String),
}
