use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use jobwatch_metadata_store::MetadataError;
use jobwatch_timeseries_store::TimeseriesError;

use crate::artifacts::ArtifactError;

/// Request-level failures, mapped onto HTTP statuses at the boundary.
///
/// Absence (unknown job, missing artifact) is 404 and is not treated as a
/// hard failure; malformed input fails with 400 before any store call;
/// malformed upstream data is 502; unreachable stores are 503.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    ParseError(String),

    #[error("{0}")]
    Upstream(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::ParseError(_) => StatusCode::BAD_GATEWAY,
            ApiError::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<MetadataError> for ApiError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::InvalidArguments(msg) => ApiError::InvalidArgument(msg),
            MetadataError::MalformedRecord(msg) => ApiError::ParseError(msg),
            MetadataError::StorageError(e) => ApiError::Upstream(e.to_string()),
        }
    }
}

impl From<TimeseriesError> for ApiError {
    fn from(err: TimeseriesError) -> Self {
        match err {
            TimeseriesError::InvalidArguments(msg) => ApiError::InvalidArgument(msg),
            TimeseriesError::ParseError(msg) => ApiError::ParseError(msg),
            TimeseriesError::Transport(e) => ApiError::Upstream(e.to_string()),
            TimeseriesError::QueryError(msg) => ApiError::Upstream(msg),
        }
    }
}

impl From<ArtifactError> for ApiError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::InvalidPath(msg) => ApiError::InvalidArgument(msg),
            ArtifactError::ParseError(msg) => ApiError::ParseError(msg),
            ArtifactError::Io(e) => ApiError::Upstream(e.to_string()),
        }
    }
}
