use thiserror::Error;

pub type Result<T> = std::result::Result<T, TimeseriesError>;

#[derive(Error, Debug)]
pub enum TimeseriesError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Malformed series identifier: {0}")]
    ParseError(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Query error: {0}")]
    QueryError(String),
}
