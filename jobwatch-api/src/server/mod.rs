mod app;
mod errors;
mod jobs;
mod logs;
mod timeseries;

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Debug, Parser, Clone)]
#[command(name = "jobwatch-api")]
#[command(about = "Jobwatch - read-only monitoring API for computational jobs", long_about = None)]
#[command(version)]
pub struct ServerArgs {
    /// HTTP server listen address
    #[arg(long, default_value = "0.0.0.0:8080", env = "JOBWATCH_LISTEN_ADDR")]
    pub listen_addr: String,

    /// Metadata (document) store connection URI
    #[arg(
        long,
        default_value = "mongodb://127.0.0.1:27017",
        env = "JOBWATCH_METADATA_URI"
    )]
    pub metadata_uri: String,

    /// Metadata store database name
    #[arg(long, default_value = "jobwatch", env = "JOBWATCH_METADATA_DB")]
    pub metadata_db: String,

    /// Use an in-memory metadata store instead of connecting anywhere.
    /// Intended for tests and local development.
    #[arg(long, default_value_t = false)]
    pub in_memory_metadata: bool,

    /// Time-series store base URL
    #[arg(
        long,
        default_value = "http://localhost:8086",
        env = "JOBWATCH_TIMESERIES_URL"
    )]
    pub timeseries_url: String,

    /// Time-series store database name
    #[arg(long, default_value = "jobwatch", env = "JOBWATCH_TIMESERIES_DB")]
    pub timeseries_db: String,

    /// Time-series query timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    pub timeseries_timeout_ms: u64,

    /// Root directory holding per-job output directories (logs, artifacts)
    #[arg(long, default_value = "results", env = "JOBWATCH_RESULTS_DIR")]
    pub results_dir: PathBuf,

    /// Expected heartbeat interval for running jobs, in seconds. A job is
    /// reported UNRESPONSIVE after two missed intervals.
    #[arg(long, default_value_t = 10, env = "JOBWATCH_HEARTBEAT_INTERVAL_SECS")]
    pub heartbeat_interval_secs: u64,
}

pub async fn run(args: ServerArgs) -> Result<()> {
    info!("Initializing jobwatch-api server");

    let state = app::create_app_state(args.clone()).await?;
    let router = app::build_router(state);

    let addr: SocketAddr = args.listen_addr.parse()?;
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router.into_make_service()).await?;

    Ok(())
}
