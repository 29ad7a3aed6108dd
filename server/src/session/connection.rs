//! Individual client connection handling

use crate::context::RelayContext;
use crate::error::RelayError;
use anyhow::{Context, Result};
use dronerelay_shared::RelayFrame;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to send frames to a specific client and observe its liveness
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub conn_id: u64,
    pub addr: SocketAddr,
    outbound: mpsc::Sender<String>,
}

impl SessionHandle {
    /// Create a handle together with the queue its writer drains
    pub fn channel(addr: SocketAddr, capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (outbound, outbound_rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            conn_id: NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed),
            addr,
            outbound,
        };
        (handle, outbound_rx)
    }

    /// Queue a frame for this client, waiting if its queue is full
    pub async fn send(&self, frame: &RelayFrame) -> Result<(), RelayError> {
        self.outbound
            .send(frame.encode())
            .await
            .map_err(|_| RelayError::ConnectionClosed)
    }

    /// Queue a frame without waiting. A full queue drops the frame.
    pub fn try_send(&self, frame: &RelayFrame) -> Result<(), RelayError> {
        self.outbound.try_send(frame.encode()).map_err(|e| match e {
            TrySendError::Full(_) => RelayError::QueueFull,
            TrySendError::Closed(_) => RelayError::ConnectionClosed,
        })
    }

    /// True once the client's writer is gone
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

/// Serve one client: upgrade to WebSocket, then route every frame until the
/// peer goes away.
///
/// The session stays registered after this returns; the reaper evicts it on
/// its next sweep.
pub async fn serve(stream: TcpStream, addr: SocketAddr, ctx: Arc<RelayContext>) -> Result<()> {
    let ws = accept_async(stream)
        .await
        .with_context(|| format!("websocket upgrade failed for {addr}"))?;
    let (mut write, mut read) = ws.split();

    let (handle, mut outbound_rx) = SessionHandle::channel(addr, ctx.config.outbound_queue);
    let write_timeout = ctx.config.message_timeout;
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            match timeout(write_timeout, write.send(Message::text(frame))).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => break,
                Err(_) => {
                    warn!("Write to {} stalled, closing", addr);
                    break;
                }
            }
        }
        // Dropping the queue marks the session closed for the reaper
        drop(outbound_rx);
        let _ = timeout(write_timeout, write.close()).await;
    });

    debug!("Connection {} established from {}", handle.conn_id, addr);

    while let Some(message) = read.next().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                warn!("Read error from {}: {}", addr, e);
                break;
            }
        };

        match &message {
            Message::Text(_) | Message::Binary(_) => match message.to_text() {
                Ok(text) => ctx.router.handle_frame(text, &handle).await,
                Err(_) => {
                    let reply = RelayFrame::Error(RelayError::UnknownMessage.to_string());
                    if handle.send(&reply).await.is_err() {
                        break;
                    }
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    writer.abort();
    info!("Client disconnected: {}", addr);
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_handle(capacity: usize) -> (SessionHandle, mpsc::Receiver<String>) {
    SessionHandle::channel(SocketAddr::from(([127, 0, 0, 1], 0)), capacity)
}
