//! Connection manager with a persistent relay link and automatic reconnection

use anyhow::{anyhow, Result};
use dronerelay_shared::{ClientFrame, RelayFrame};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

type RelayStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Events emitted by the connection manager
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// WebSocket link to the relay is up
    Connected,
    /// Relay accepted our credentials
    Authenticated { token: String },
    /// Link dropped
    Disconnected { reason: String },
    /// Received a frame from the relay
    Received(RelayFrame),
    /// Connect attempt failed; will retry after backoff
    ConnectionFailed { reason: String },
}

/// Configuration for connection manager
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Relay WebSocket URL
    pub relay_url: String,
    /// Identity to log in as
    pub identity: String,
    /// Shared secret for `identity`
    pub password: String,
    /// Reconnection delay (initial)
    pub reconnect_delay: Duration,
    /// Maximum reconnection delay
    pub max_reconnect_delay: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Time allowed for the relay to answer LOGIN
    pub login_timeout: Duration,
    /// Period of the heartbeat status update, `None` to disable
    pub status_interval: Option<Duration>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            relay_url: "ws://127.0.0.1:8765".into(),
            identity: "drone1".into(),
            password: "333".into(),
            reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            login_timeout: Duration::from_secs(5),
            status_interval: Some(Duration::from_secs(5)),
        }
    }
}

/// Manages the persistent link to the relay
pub struct ConnectionManager {
    config: ConnectionConfig,
    /// Channel to send frames to the relay
    outbound_tx: mpsc::Sender<ClientFrame>,
    /// Channel to receive connection events
    event_rx: mpsc::Receiver<ConnectionEvent>,
}

impl ConnectionManager {
    /// Create a new connection manager and start the connection loop
    pub fn new(config: ConnectionConfig) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel::<ClientFrame>(100);
        let (event_tx, event_rx) = mpsc::channel::<ConnectionEvent>(100);

        let config_clone = config.clone();
        tokio::spawn(async move {
            connection_loop(config_clone, outbound_rx, event_tx).await;
        });

        Self {
            config,
            outbound_tx,
            event_rx,
        }
    }

    /// Send a frame to the relay
    pub async fn send(&self, frame: ClientFrame) -> Result<()> {
        self.outbound_tx
            .send(frame)
            .await
            .map_err(|_| anyhow!("Connection closed"))
    }

    /// Receive the next connection event
    pub async fn recv(&mut self) -> Option<ConnectionEvent> {
        self.event_rx.recv().await
    }

    /// Get the identity this link logs in as
    pub fn identity(&self) -> &str {
        &self.config.identity
    }
}

/// Main connection loop with reconnection logic
async fn connection_loop(
    config: ConnectionConfig,
    mut outbound_rx: mpsc::Receiver<ClientFrame>,
    event_tx: mpsc::Sender<ConnectionEvent>,
) {
    let mut reconnect_delay = config.reconnect_delay;

    loop {
        match timeout(config.connect_timeout, connect_async(config.relay_url.as_str())).await {
            Ok(Ok((stream, _))) => {
                reconnect_delay = config.reconnect_delay;

                let _ = event_tx.send(ConnectionEvent::Connected).await;

                if let Err(reason) =
                    handle_connection(stream, &config, &mut outbound_rx, &event_tx).await
                {
                    let _ = event_tx
                        .send(ConnectionEvent::Disconnected {
                            reason: reason.to_string(),
                        })
                        .await;
                }
            }
            Ok(Err(e)) => {
                let _ = event_tx
                    .send(ConnectionEvent::ConnectionFailed {
                        reason: format!("{}: {}", config.relay_url, e),
                    })
                    .await;
            }
            Err(_) => {
                let _ = event_tx
                    .send(ConnectionEvent::ConnectionFailed {
                        reason: format!("{}: connect timed out", config.relay_url),
                    })
                    .await;
            }
        }

        if event_tx.is_closed() {
            break;
        }

        tokio::time::sleep(reconnect_delay).await;
        reconnect_delay = next_backoff(reconnect_delay, config.max_reconnect_delay);
    }
}

/// Exponential backoff capped at `max`
fn next_backoff(current: Duration, max: Duration) -> Duration {
    std::cmp::min(current * 2, max)
}

/// Log in and pump frames until the link drops
async fn handle_connection(
    stream: RelayStream,
    config: &ConnectionConfig,
    outbound_rx: &mut mpsc::Receiver<ClientFrame>,
    event_tx: &mpsc::Sender<ConnectionEvent>,
) -> Result<()> {
    let (mut writer, mut reader) = stream.split();

    let login = ClientFrame::Login {
        identity: config.identity.clone(),
        password: config.password.clone(),
    };
    writer.send(Message::text(login.encode())).await?;

    let token = timeout(config.login_timeout, await_token(&mut reader))
        .await
        .map_err(|_| anyhow!("Relay did not answer LOGIN"))??;
    let _ = event_tx.send(ConnectionEvent::Authenticated { token }).await;

    let period = config.status_interval.unwrap_or(Duration::from_secs(3600));
    let mut status_interval = interval(period);
    status_interval.tick().await;

    loop {
        tokio::select! {
            // Heartbeat status
            _ = status_interval.tick(), if config.status_interval.is_some() => {
                let heartbeat = ClientFrame::StatusUpdate {
                    text: format!("{} heartbeat", config.identity),
                };
                send_frame(&mut writer, &heartbeat).await?;
            }

            // Send outbound frames
            Some(frame) = outbound_rx.recv() => {
                send_frame(&mut writer, &frame).await?;
            }

            // Read incoming frames
            message = reader.next() => {
                match message {
                    Some(Ok(Message::Close(_))) | None => {
                        return Err(anyhow!("Relay closed connection"));
                    }
                    Some(Ok(message)) if message.is_text() => {
                        match RelayFrame::parse(message.to_text()?) {
                            Ok(frame) => {
                                let _ = event_tx.send(ConnectionEvent::Received(frame)).await;
                            }
                            Err(e) => debug!("Ignoring frame from relay: {}", e),
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        return Err(anyhow!("Read error: {}", e));
                    }
                }
            }
        }
    }
}

async fn send_frame(
    writer: &mut SplitSink<RelayStream, Message>,
    frame: &ClientFrame,
) -> Result<()> {
    writer.send(Message::text(frame.encode())).await?;
    Ok(())
}

/// Wait for the relay's answer to LOGIN
async fn await_token(reader: &mut SplitStream<RelayStream>) -> Result<String> {
    while let Some(message) = reader.next().await {
        let message = message?;
        if !message.is_text() {
            continue;
        }
        match RelayFrame::parse(message.to_text()?) {
            Ok(RelayFrame::Jwt(token)) => return Ok(token),
            Ok(RelayFrame::Error(reason)) => return Err(anyhow!("Login rejected: {}", reason)),
            _ => continue,
        }
    }
    Err(anyhow!("Relay closed connection during login"))
}
