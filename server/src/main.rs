use anyhow::Context;
use clap::Parser;
use dronerelay_server::config::Args;
use dronerelay_server::{server, RelayContext};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = Args::parse().into_config()?;

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!("Relay listening on {}", config.bind_addr);
    info!("  {} credentials loaded", config.credentials.len());
    info!("  frame budget {}ms", config.message_timeout.as_millis());

    let ctx = RelayContext::new(config);
    server::run(listener, ctx).await
}
