mod artifacts;
mod server;

use anyhow::Result;
use clap::Parser;

use crate::server::ServerArgs;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = ServerArgs::parse();

    tracing::info!("Starting jobwatch API server");
    server::run(args).await
}
