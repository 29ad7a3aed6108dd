mod command;
mod connection;

use clap::Parser;
use command::CommandExecutor;
use connection::{ConnectionConfig, ConnectionEvent, ConnectionManager};
use dronerelay_shared::RelayFrame;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Drone endpoint for the command relay
#[derive(Debug, Parser)]
#[command(name = "drone-edge", version)]
struct Args {
    /// Relay WebSocket URL
    #[arg(long, env = "DRONE_RELAY", default_value = "ws://127.0.0.1:8765")]
    relay: String,

    /// Identity to log in as
    #[arg(long, env = "DRONE_IDENTITY", default_value = "drone1")]
    identity: String,

    /// Shared secret for the identity
    #[arg(long, env = "DRONE_PASSWORD", default_value = "333")]
    password: String,

    /// Heartbeat status period in milliseconds, 0 to disable
    #[arg(long, default_value_t = 5000)]
    status_interval_ms: u64,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = Args::parse();
    let config = ConnectionConfig {
        relay_url: args.relay,
        identity: args.identity,
        password: args.password,
        status_interval: (args.status_interval_ms > 0)
            .then(|| Duration::from_millis(args.status_interval_ms)),
        ..Default::default()
    };

    info!("Drone endpoint starting: {}", config.identity);
    info!("  relay: {}", config.relay_url);

    let mut conn = ConnectionManager::new(config);
    let executor = CommandExecutor::new(conn.identity());

    // Main event loop
    loop {
        match conn.recv().await {
            Some(ConnectionEvent::Connected) => {
                info!("Connected to relay");
            }
            Some(ConnectionEvent::Authenticated { token }) => {
                info!(
                    "Logged in as {} (state={})",
                    conn.identity(),
                    executor.get_state().await
                );
                debug!("Token of {} bytes issued", token.len());
            }
            Some(ConnectionEvent::Disconnected { reason }) => {
                warn!("Disconnected: {}", reason);
            }
            Some(ConnectionEvent::ConnectionFailed { reason }) => {
                error!("Connection failed: {}", reason);
            }
            Some(ConnectionEvent::Received(frame)) => {
                handle_relay_frame(frame, &conn, &executor).await;
            }
            None => {
                error!("Connection manager closed");
                break;
            }
        }
    }
}

async fn handle_relay_frame(frame: RelayFrame, conn: &ConnectionManager, executor: &CommandExecutor) {
    match frame {
        RelayFrame::Command(command) => {
            let report = executor.execute(&command).await;
            if let Err(e) = conn.send(report).await {
                error!("Failed to report command outcome: {}", e);
            }
        }
        RelayFrame::Error(reason) => {
            warn!("Relay error: {}", reason);
        }
        other => {
            debug!("Unhandled frame: {}", other);
        }
    }
}
