use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use jobwatch_core::Job;
use jobwatch_metadata_store::JobStore;

use super::app::AppState;
use super::errors::ApiError;

// Workers write their captured stdout/stderr here, relative to the job's
// output directory.
const LOG_FILENAME: &str = "output.txt";

#[derive(Debug, Default, Deserialize)]
pub struct ArtifactParams {
    /// "text" (default) or "json"
    pub format: Option<String>,
}

pub async fn job_logs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<String, ApiError> {
    let output_dir = job_output_dir(&state, &id).await?;
    state
        .artifacts
        .read_text(&output_dir, LOG_FILENAME)
        .await?
        .ok_or(ApiError::NotFound)
}

pub async fn job_artifact(
    State(state): State<Arc<AppState>>,
    Path((id, filename)): Path<(String, String)>,
    Query(params): Query<ArtifactParams>,
) -> Result<Response, ApiError> {
    let output_dir = job_output_dir(&state, &id).await?;

    match params.format.as_deref() {
        Some("json") => {
            let value = state
                .artifacts
                .read_json(&output_dir, &filename)
                .await?
                .ok_or(ApiError::NotFound)?;
            Ok(Json(value).into_response())
        }
        None | Some("text") => {
            let content = state
                .artifacts
                .read_text(&output_dir, &filename)
                .await?
                .ok_or(ApiError::NotFound)?;
            Ok(content.into_response())
        }
        Some(other) => Err(ApiError::InvalidArgument(format!(
            "unknown artifact format: {}",
            other
        ))),
    }
}

/// Artifacts hang off the job's output directory; a job that has produced no
/// output directory yet simply has no artifacts.
async fn job_output_dir(state: &AppState, id: &str) -> Result<String, ApiError> {
    let job: Job = state
        .jobs
        .find_one(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    job.output_directory.ok_or(ApiError::NotFound)
}
