//! Periodic sweep of closed connections

use super::SessionRegistry;
use crate::broadcast::BroadcastNotifier;
use dronerelay_shared::{RelayFrame, Role};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{debug, info};

/// Evicts sessions whose connection has closed and tells operators about it
pub struct ConnectionReaper {
    registry: Arc<SessionRegistry>,
    notifier: Arc<BroadcastNotifier>,
    sweep_interval: Duration,
}

impl ConnectionReaper {
    /// Create a new reaper
    pub fn new(
        registry: Arc<SessionRegistry>,
        notifier: Arc<BroadcastNotifier>,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            registry,
            notifier,
            sweep_interval,
        }
    }

    /// Run one sweep: drones first, then operators. Returns the evicted
    /// identities in that order.
    pub async fn sweep(&self) -> Vec<String> {
        let mut evicted = Vec::new();

        for role in [Role::Drone, Role::Operator] {
            for identity in self.registry.remove_closed(role).await {
                info!("{} {} disconnected", role, identity);
                let event = RelayFrame::StatusUpdate(format!("{}, disconnected", identity));
                self.notifier.notify_status(&event).await;
                evicted.push(identity);
            }
        }

        // Neither drones nor operators: nobody is told
        for identity in self.registry.remove_closed(Role::Unclassified).await {
            debug!("Session {} closed", identity);
        }

        evicted
    }

    /// Sweep forever on the configured period, starting one period from now
    pub async fn run(&self) {
        let mut ticker = interval(self.sweep_interval);
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let evicted = self.sweep().await;
            if !evicted.is_empty() {
                debug!("Reaped {} sessions", evicted.len());
            }
        }
    }

    /// Start the sweep loop as a background task
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }
}
