//! Status fan-out to operators

use super::observer::StatusObserver;
use crate::session::SessionRegistry;
use dronerelay_shared::RelayFrame;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Delivers status events to every registered operator.
///
/// Each event goes two ways: the event frame is sent straight to each
/// operator connection, and the observer list receives a `DRONES_STATUS`
/// snapshot of connected drones. Observers are never pruned; a stale one
/// simply fails to deliver.
pub struct BroadcastNotifier {
    registry: Arc<SessionRegistry>,
    observers: RwLock<Vec<Arc<dyn StatusObserver>>>,
    /// Re-run the observer fan-out once per operator instead of once per event
    legacy_double_notify: bool,
}

impl BroadcastNotifier {
    /// Create a notifier reading operators from `registry`
    pub fn new(registry: Arc<SessionRegistry>, legacy_double_notify: bool) -> Self {
        Self {
            registry,
            observers: RwLock::new(Vec::new()),
            legacy_double_notify,
        }
    }

    /// Append an observer. A second subscription from the same connection is
    /// ignored; returns whether the observer was added.
    pub async fn subscribe(&self, observer: Arc<dyn StatusObserver>) -> bool {
        let mut observers = self.observers.write().await;
        if observers.iter().any(|o| o.conn_id() == observer.conn_id()) {
            return false;
        }
        observers.push(observer);
        true
    }

    /// Number of subscribed observers, stale ones included
    pub async fn observer_count(&self) -> usize {
        self.observers.read().await.len()
    }

    /// Push `event` to all operators. Never fails: delivery errors are logged.
    ///
    /// Sends never wait on a connection, so an operator that stops reading
    /// loses frames instead of holding up the others.
    pub async fn notify_status(&self, event: &RelayFrame) {
        let operators = self.registry.all_operators().await;
        if operators.is_empty() {
            return;
        }

        let snapshot = self.registry.snapshot_drones().await;
        let snapshot = serde_json::to_string(&snapshot).unwrap_or_else(|_| "{}".into());
        debug!("Sending drones status to operators: {}", snapshot);
        let status = RelayFrame::DronesStatus(snapshot);

        for operator in &operators {
            debug!("{} -> {}", event, operator.addr);
            if let Err(e) = operator.try_send(event) {
                warn!("Failed to send to operator at {}: {}", operator.addr, e);
            }

            if self.legacy_double_notify {
                self.notify_observers(&status).await;
            }
        }

        if !self.legacy_double_notify {
            self.notify_observers(&status).await;
        }
    }

    /// Fire-and-forget delivery to every observer
    async fn notify_observers(&self, status: &RelayFrame) {
        let observers = self.observers.read().await.clone();

        for observer in observers {
            let status = status.clone();
            tokio::spawn(async move {
                if let Err(e) = observer.update(&status).await {
                    debug!("Observer {} missed status: {}", observer.name(), e);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::OperatorObserver;
    use crate::session::test_handle;
    use dronerelay_shared::Role;
    use std::time::Duration;
    use tokio::sync::mpsc::error::TryRecvError;

    async fn operator(
        registry: &SessionRegistry,
        notifier: &BroadcastNotifier,
        identity: &str,
    ) -> tokio::sync::mpsc::Receiver<String> {
        let (handle, rx) = test_handle(16);
        registry.register(identity, Role::Operator, handle.clone()).await;
        notifier
            .subscribe(Arc::new(OperatorObserver::new(identity, handle)))
            .await;
        rx
    }

    async fn next(rx: &mut tokio::sync::mpsc::Receiver<String>) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .ok()
            .flatten()
    }

    #[tokio::test]
    async fn test_no_operators_is_a_noop() {
        let registry = Arc::new(SessionRegistry::new());
        let notifier = BroadcastNotifier::new(registry.clone(), false);
        let (drone, mut drone_rx) = test_handle(4);
        registry.register("drone1", Role::Drone, drone).await;

        notifier
            .notify_status(&RelayFrame::StatusUpdate("hello".into()))
            .await;
        tokio::task::yield_now().await;

        assert_eq!(drone_rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_operator_gets_event_then_snapshot() {
        let registry = Arc::new(SessionRegistry::new());
        let notifier = BroadcastNotifier::new(registry.clone(), false);
        let (drone, _drone_rx) = test_handle(4);
        registry.register("drone1", Role::Drone, drone).await;
        let mut user_rx = operator(&registry, &notifier, "user1").await;

        notifier
            .notify_status(&RelayFrame::Connected("drone1".into()))
            .await;

        assert_eq!(next(&mut user_rx).await.as_deref(), Some("LOGIN:drone1, connected"));
        assert_eq!(
            next(&mut user_rx).await.as_deref(),
            Some(r#"DRONES_STATUS:{"drone1":"connected"}"#)
        );
        tokio::task::yield_now().await;
        assert_eq!(user_rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_one_snapshot_per_operator_per_event() {
        let registry = Arc::new(SessionRegistry::new());
        let notifier = BroadcastNotifier::new(registry.clone(), false);
        let mut rx1 = operator(&registry, &notifier, "user1").await;
        let mut rx2 = operator(&registry, &notifier, "user2").await;

        notifier
            .notify_status(&RelayFrame::StatusUpdate("drone1 airborne".into()))
            .await;

        for rx in [&mut rx1, &mut rx2] {
            assert_eq!(next(rx).await.as_deref(), Some("STATUS_UPDATE:drone1 airborne"));
            assert_eq!(next(rx).await.as_deref(), Some("DRONES_STATUS:{}"));
            tokio::task::yield_now().await;
            assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
        }
    }

    #[tokio::test]
    async fn test_legacy_mode_repeats_snapshot_per_operator() {
        let registry = Arc::new(SessionRegistry::new());
        let notifier = BroadcastNotifier::new(registry.clone(), true);
        let mut rx1 = operator(&registry, &notifier, "user1").await;
        let mut rx2 = operator(&registry, &notifier, "user2").await;

        notifier
            .notify_status(&RelayFrame::StatusUpdate("x".into()))
            .await;

        for rx in [&mut rx1, &mut rx2] {
            let mut frames = Vec::new();
            while let Some(frame) = next(rx).await {
                frames.push(frame);
                if frames.len() == 3 {
                    break;
                }
            }
            assert_eq!(frames.iter().filter(|f| *f == "STATUS_UPDATE:x").count(), 1);
            assert_eq!(frames.iter().filter(|f| *f == "DRONES_STATUS:{}").count(), 2);
        }
    }

    #[tokio::test]
    async fn test_stale_observer_does_not_block_others() {
        let registry = Arc::new(SessionRegistry::new());
        let notifier = BroadcastNotifier::new(registry.clone(), false);

        // Subscribed earlier, connection since closed and no longer registered
        let (stale, stale_rx) = test_handle(4);
        notifier
            .subscribe(Arc::new(OperatorObserver::new("user9", stale)))
            .await;
        drop(stale_rx);

        let mut live_rx = operator(&registry, &notifier, "user1").await;
        assert_eq!(notifier.observer_count().await, 2);

        notifier
            .notify_status(&RelayFrame::StatusUpdate("ok".into()))
            .await;

        assert_eq!(next(&mut live_rx).await.as_deref(), Some("STATUS_UPDATE:ok"));
        assert_eq!(next(&mut live_rx).await.as_deref(), Some("DRONES_STATUS:{}"));
    }

    #[tokio::test]
    async fn test_stalled_operator_does_not_block_others() {
        let registry = Arc::new(SessionRegistry::new());
        let notifier = BroadcastNotifier::new(registry.clone(), false);

        // Open but never read: queue already full
        let (stalled, _stalled_rx) = test_handle(1);
        stalled
            .try_send(&RelayFrame::StatusUpdate("backlog".into()))
            .expect("prefill failed");
        registry.register("user1", Role::Operator, stalled.clone()).await;
        notifier
            .subscribe(Arc::new(OperatorObserver::new("user1", stalled)))
            .await;
        let mut live_rx = operator(&registry, &notifier, "user2").await;

        let sent = tokio::time::timeout(
            Duration::from_secs(1),
            notifier.notify_status(&RelayFrame::StatusUpdate("drone1 landed".into())),
        )
        .await;

        assert!(sent.is_ok(), "notify_status waited on a full queue");
        assert_eq!(
            next(&mut live_rx).await.as_deref(),
            Some("STATUS_UPDATE:drone1 landed")
        );
        assert_eq!(next(&mut live_rx).await.as_deref(), Some("DRONES_STATUS:{}"));
    }

    #[tokio::test]
    async fn test_duplicate_subscription_ignored() {
        let registry = Arc::new(SessionRegistry::new());
        let notifier = BroadcastNotifier::new(registry, false);
        let (handle, _rx) = test_handle(4);

        assert!(
            notifier
                .subscribe(Arc::new(OperatorObserver::new("user1", handle.clone())))
                .await
        );
        assert!(
            !notifier
                .subscribe(Arc::new(OperatorObserver::new("user1", handle)))
                .await
        );
        assert_eq!(notifier.observer_count().await, 1);
    }
}
