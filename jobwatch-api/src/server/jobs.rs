use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use jobwatch_core::{
    effective_status, ConfigValue, Entry, Environment, Job, JobFilter, JobStatus,
};
use jobwatch_metadata_store::JobStore;

use super::app::AppState;
use super::errors::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct JobsParams {
    // Comma-separated job ids
    pub ids: Option<String>,
    pub user: Option<String>,
    pub project: Option<String>,
    pub experiment: Option<String>,
    pub host: Option<String>,
    // Anchored regex on the job name
    pub job: Option<String>,
    pub status: Option<String>,
    pub limit: Option<u64>,
}

#[derive(Serialize)]
pub struct JobsResponse {
    pub jobs: Vec<JobDto>,
}

/// A job as presented to clients: effective status applied, times in
/// milliseconds since epoch.
#[derive(Debug, Serialize)]
pub struct JobDto {
    pub id: String,
    pub user: String,
    pub project: String,
    pub experiment: String,
    pub job: String,
    pub status: JobStatus,
    pub host: String,
    pub output_directory: Option<String>,
    pub creation_time: i64,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub config: Vec<Entry<ConfigValue>>,
    pub annotations: Vec<Entry<String>>,
    pub exception: Option<String>,
    pub environment: Environment,
    pub progress: Option<f64>,
}

impl JobDto {
    pub fn from_job(job: Job, now: DateTime<Utc>, heartbeat_interval_secs: u64) -> Self {
        let status = effective_status(
            job.status,
            job.last_heartbeat_time,
            now,
            heartbeat_interval_secs,
        );
        JobDto {
            id: job.id,
            user: job.user,
            project: job.project,
            experiment: job.experiment,
            job: job.job,
            status,
            host: job.host,
            output_directory: job.output_directory,
            creation_time: job.creation_time.timestamp_millis(),
            start_time: job.start_time.map(|t| t.timestamp_millis()),
            end_time: job.end_time.map(|t| t.timestamp_millis()),
            config: job.config,
            annotations: job.annotations,
            exception: job.exception,
            environment: job.environment,
            progress: job.progress,
        }
    }
}

fn parse_filter(params: JobsParams) -> Result<JobFilter, ApiError> {
    let ids = params.ids.map(|raw| {
        raw.split(',')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>()
    });
    let status = params
        .status
        .as_deref()
        .map(str::parse::<JobStatus>)
        .transpose()
        .map_err(|e| ApiError::InvalidArgument(e.to_string()))?;

    Ok(JobFilter {
        ids,
        user: params.user,
        project: params.project,
        experiment: params.experiment,
        host: params.host,
        job: params.job,
        status,
        limit: params.limit,
    })
}

pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<JobsParams>,
) -> Result<Json<JobsResponse>, ApiError> {
    let filter = parse_filter(params)?;
    let now = Utc::now();

    let jobs = state.jobs.find(&filter, now).await?;
    let jobs = jobs
        .into_iter()
        .map(|job| JobDto::from_job(job, now, state.heartbeat_interval_secs))
        .collect();

    Ok(Json(JobsResponse { jobs }))
}

pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobDto>, ApiError> {
    let now = Utc::now();
    let job = state
        .jobs
        .find_one(&id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(JobDto::from_job(
        job,
        now,
        state.heartbeat_interval_secs,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn filter_parses_ids_and_status() {
        let params = JobsParams {
            ids: Some("65f000000000000000000001,65f000000000000000000002".to_string()),
            status: Some("FAILED".to_string()),
            limit: Some(5),
            ..Default::default()
        };
        let filter = parse_filter(params).unwrap();
        assert_eq!(filter.ids.as_ref().unwrap().len(), 2);
        assert_eq!(filter.status, Some(JobStatus::Failed));
        assert_eq!(filter.limit, Some(5));
    }

    #[test]
    fn unknown_status_is_invalid_argument() {
        let params = JobsParams {
            status: Some("SLEEPING".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            parse_filter(params),
            Err(ApiError::InvalidArgument(_))
        ));
    }

    /// The presented record derives its status at read time: a RUNNING job
    /// with a stale heartbeat is reported UNRESPONSIVE.
    #[test]
    fn dto_applies_effective_status() {
        let job = Job {
            id: "65f000000000000000000001".to_string(),
            user: "ada".to_string(),
            project: "sgd".to_string(),
            experiment: "baseline".to_string(),
            job: "train-1".to_string(),
            status: JobStatus::Running,
            host: "node-7".to_string(),
            output_directory: None,
            creation_time: now() - Duration::hours(1),
            start_time: Some(now() - Duration::hours(1)),
            end_time: None,
            last_heartbeat_time: Some(now() - Duration::seconds(90)),
            config: vec![],
            annotations: vec![],
            exception: None,
            environment: Environment::default(),
            progress: Some(0.5),
        };

        let dto = JobDto::from_job(job, now(), 10);
        assert_eq!(dto.status, JobStatus::Unresponsive);
        assert_eq!(
            dto.start_time,
            Some((now() - Duration::hours(1)).timestamp_millis())
        );
    }
}
