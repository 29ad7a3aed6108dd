//! Accept loop tying the transport to the relay core

use crate::context::RelayContext;
use crate::session;
use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Start the reaper and serve every incoming connection on `listener`
pub async fn run(listener: TcpListener, ctx: Arc<RelayContext>) -> Result<()> {
    let _reaper = Arc::new(ctx.reaper()).spawn();
    info!(
        "Reaper sweeping every {}ms",
        ctx.config.sweep_interval.as_millis()
    );

    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Accept failed: {}", e);
                continue;
            }
        };
        info!("Connection from: {}", addr);

        let ctx = ctx.clone();
        tokio::spawn(async move {
            if let Err(e) = session::serve(stream, addr, ctx).await {
                warn!("Connection {} ended with error: {:#}", addr, e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use futures::{SinkExt, StreamExt};
    use std::time::Duration;
    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn start_relay() -> String {
        let config = RelayConfig {
            sweep_interval: Duration::from_millis(50),
            ..Default::default()
        };
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
        let addr = listener.local_addr().expect("no local addr");
        tokio::spawn(run(listener, RelayContext::new(config)));
        format!("ws://{}", addr)
    }

    async fn connect(url: &str) -> Client {
        let (ws, _) = connect_async(url).await.expect("connect failed");
        ws
    }

    async fn send(ws: &mut Client, frame: &str) {
        ws.send(Message::text(frame.to_string()))
            .await
            .expect("send failed");
    }

    /// Next text frame, skipping drone snapshots
    async fn recv_event(ws: &mut Client) -> String {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
                .await
                .expect("timed out waiting for frame")
                .expect("stream ended")
                .expect("websocket error");
            if !msg.is_text() {
                continue;
            }
            let text = msg.to_text().expect("text frame").to_string();
            if !text.starts_with("DRONES_STATUS:") {
                return text;
            }
        }
    }

    #[tokio::test]
    async fn test_end_to_end_relay() {
        let url = start_relay().await;

        let mut user = connect(&url).await;
        send(&mut user, "LOGIN:user1,111").await;
        let token = recv_event(&mut user)
            .await
            .strip_prefix("JWT:")
            .expect("expected token")
            .to_string();
        assert_eq!(recv_event(&mut user).await, "LOGIN:user1, connected");

        let mut drone = connect(&url).await;
        send(&mut drone, "LOGIN:drone1,333").await;
        assert!(recv_event(&mut drone).await.starts_with("JWT:"));
        assert_eq!(recv_event(&mut user).await, "LOGIN:drone1, connected");

        send(&mut user, &format!("COMMAND:{},drone1,TAKEOFF", token)).await;
        assert_eq!(recv_event(&mut drone).await, "COMMAND:TAKEOFF");
        assert_eq!(
            recv_event(&mut user).await,
            "AUTHORIZED: Command TAKEOFF sent to drone drone1"
        );

        send(&mut drone, "STATUS_UPDATE: airborne").await;
        assert_eq!(recv_event(&mut user).await, "STATUS_UPDATE:airborne");

        send(&mut user, "BOGUS").await;
        assert_eq!(recv_event(&mut user).await, "ERROR: Unknown command");

        drone.close(None).await.expect("close failed");
        assert_eq!(
            recv_event(&mut user).await,
            "STATUS_UPDATE:drone1, disconnected"
        );

        send(&mut user, &format!("COMMAND:{},drone1,LAND", token)).await;
        assert_eq!(
            recv_event(&mut user).await,
            "ERROR: Drone drone1 is not connected"
        );
    }

    #[tokio::test]
    async fn test_rejected_login_keeps_connection_open() {
        let url = start_relay().await;
        let mut client = connect(&url).await;

        send(&mut client, "LOGIN:user1,wrong").await;
        assert_eq!(
            recv_event(&mut client).await,
            "ERROR: Invalid username or password"
        );

        send(&mut client, "LOGIN:user1,111").await;
        assert!(recv_event(&mut client).await.starts_with("JWT:"));
    }
}
