//! CLI entry point (C10): parses arguments, loads configuration, wires up
//! tracing, and runs the server until a shutdown signal arrives.

use clap::Parser;
use registry_server::config::Args;
use registry_server::{Server, ServerConfig};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = ServerConfig::load(&args)?;

    init_tracing(&config);

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "loaded configuration"
    );

    let server = Server::new(config).await?;
    server.start().await?;

    Ok(())
}

fn init_tracing(config: &ServerConfig) {
    let filter = EnvFilter::try_new(&config.monitoring.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if config.monitoring.structured_logging {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}
