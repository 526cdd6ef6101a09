mod config;
mod error;
mod ical_bridge;
mod schedule;
mod server;

use anyhow::{Result, anyhow};
use rmcp::ServiceExt;
use tracing_subscriber::EnvFilter;

use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    // Log to stderr, stdout is the MCP stdio transport
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting Runsheet MCP server v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();
    tracing::info!(
        "Display timezone {}, default setup time {}",
        config.timezone.name(),
        config.default_setup_time
    );

    let server = server::RunsheetServer::new(config);
    let router = server.into_router();
    let service = router.serve(rmcp::transport::io::stdio()).await?;

    tracing::info!("Runsheet is ready");
    service.waiting().await?;

    Ok(())
}
