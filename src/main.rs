//! SQL gateway - a read-only HTTP API for SELECT queries against PostgreSQL.

use std::sync::Arc;

use anyhow::Context;
use sql_gateway::api::{self, AppState};
use sql_gateway::cli::Cli;
use sql_gateway::db::PostgresClient;
use sql_gateway::logging;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();

    match &cli.log_file {
        Some(path) => logging::init_file_logging(path),
        None => logging::init_stderr_logging(),
    }

    if let Err(e) = run(cli).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    info!("Loading config from: {}", cli.config_path().display());
    let config = cli.resolve_config().context("failed to load configuration")?;

    let addr = config
        .server
        .socket_addr()
        .context("invalid listen address")?;

    info!("Database: {}", config.database.display_string());
    let db = PostgresClient::new(config.database.clone());
    let state = AppState::new(Arc::new(db));

    api::serve(addr, state)
        .await
        .with_context(|| format!("HTTP server on {addr} failed"))?;

    Ok(())
}
