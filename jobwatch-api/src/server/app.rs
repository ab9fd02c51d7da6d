use std::sync::Arc;

use anyhow::Result;
use axum::{extract::State, routing::get, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use jobwatch_metadata_store::{JobStorage, JobStore, MemoryJobStore, MongoJobStore};
use jobwatch_timeseries_store::{TimeseriesClient, TimeseriesConfig};

use super::{jobs, logs, timeseries, ServerArgs};
use crate::artifacts::ArtifactStore;

pub struct AppState {
    pub jobs: JobStorage,
    pub timeseries: TimeseriesClient,
    pub artifacts: ArtifactStore,
    pub heartbeat_interval_secs: u64,
}

#[derive(serde::Serialize)]
struct HealthDto {
    status: &'static str,
    metadata_reachable: bool,
}

pub async fn create_app_state(args: ServerArgs) -> Result<Arc<AppState>> {
    let jobs = if args.in_memory_metadata {
        tracing::info!("Using in-memory metadata store");
        JobStorage::InMemory(MemoryJobStore::new(args.heartbeat_interval_secs))
    } else {
        tracing::info!("Connecting to metadata store at {}", args.metadata_uri);
        JobStorage::Mongo(
            MongoJobStore::new(
                &args.metadata_uri,
                &args.metadata_db,
                args.heartbeat_interval_secs,
            )
            .await?,
        )
    };

    let timeseries = TimeseriesClient::new(TimeseriesConfig {
        base_url: args.timeseries_url.clone(),
        database: args.timeseries_db.clone(),
        timeout_ms: args.timeseries_timeout_ms,
    })?;

    let artifacts = ArtifactStore::new(&args.results_dir);

    Ok(Arc::new(AppState {
        jobs,
        timeseries,
        artifacts,
        heartbeat_interval_secs: args.heartbeat_interval_secs,
    }))
}

// API endpoints
// - GET  /api/v1/health
//   Health check. Returns overall status and whether the metadata store is reachable.
//
// - GET  /api/v1/jobs
//   List jobs matching the given criteria, newest first. Query params: ids (comma-separated),
//   user, project, experiment, host, job (anchored regex on the job name), status, limit
//   (0 or absent = unbounded). Every returned record carries its effective status.
//
// - GET  /api/v1/jobs/{id}
//   Single job by store id. Unknown ids return 404.
//
// - GET  /api/v1/jobs/{id}/logs
//   The job's output.txt log. 404 when the job has no output directory or no log yet.
//
// - GET  /api/v1/jobs/{id}/artifacts/{filename}
//   A file under the job's output directory, as text. With ?format=json the artifact is
//   parsed and returned as JSON; a file that exists but fails to parse is a 502.
//
// - GET  /api/v1/jobs/{id}/timeseries
//   Discover the job's series. Query params: measurement (pattern), tags (key=value,...).
//
// - GET  /api/v1/jobs/{id}/timeseries/{measurement}
//   Series page: raw values plus current/max/min aggregates, resolved concurrently.
//   Partial failures land in the `errors` field without discarding sibling results.
//
// - GET  /api/v1/jobs/{id}/timeseries/{measurement}/values
// - GET  /api/v1/jobs/{id}/timeseries/{measurement}/current
// - GET  /api/v1/jobs/{id}/timeseries/{measurement}/max
// - GET  /api/v1/jobs/{id}/timeseries/{measurement}/min
//   Individual resolution of the series page fields. All take tags (key=value,...).
//
pub fn build_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/jobs", get(jobs::list_jobs))
        .route("/api/v1/jobs/{id}", get(jobs::get_job))
        .route("/api/v1/jobs/{id}/logs", get(logs::job_logs))
        .route(
            "/api/v1/jobs/{id}/artifacts/{*filename}",
            get(logs::job_artifact),
        )
        .route("/api/v1/jobs/{id}/timeseries", get(timeseries::list_series))
        .route(
            "/api/v1/jobs/{id}/timeseries/{measurement}",
            get(timeseries::series_page),
        )
        .route(
            "/api/v1/jobs/{id}/timeseries/{measurement}/values",
            get(timeseries::series_values),
        )
        .route(
            "/api/v1/jobs/{id}/timeseries/{measurement}/current",
            get(timeseries::series_current),
        )
        .route(
            "/api/v1/jobs/{id}/timeseries/{measurement}/max",
            get(timeseries::series_max),
        )
        .route(
            "/api/v1/jobs/{id}/timeseries/{measurement}/min",
            get(timeseries::series_min),
        )
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthDto> {
    let reachable = state.jobs.ping().await.is_ok();
    Json(HealthDto {
        status: "ok",
        metadata_reachable: reachable,
    })
}
