//! Session registry for tracking all authenticated connections

use super::connection::SessionHandle;
use dronerelay_shared::Role;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use tokio::sync::RwLock;

/// Status reported for every drone in the snapshot
pub const DRONE_CONNECTED: &str = "connected";

/// A live, authenticated binding between an identity and its connection
#[derive(Debug, Clone)]
pub struct Session {
    pub identity: String,
    pub role: Role,
    pub handle: SessionHandle,
    pub connected_at: Instant,
}

/// Holds at most one session per identity.
///
/// Only the login path registers sessions, so membership implies the
/// identity passed the credential check.
pub struct SessionRegistry {
    /// Map of identity -> session
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or overwrite the session for `identity`, returning the replaced one.
    ///
    /// The replaced session's connection is left open.
    pub async fn register(&self, identity: &str, role: Role, handle: SessionHandle) -> Option<Session> {
        let session = Session {
            identity: identity.to_string(),
            role,
            handle,
            connected_at: Instant::now(),
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(identity.to_string(), session)
    }

    /// Remove the session for `identity` if present
    pub async fn unregister(&self, identity: &str) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(identity)
    }

    /// Get the session registered under `identity`
    pub async fn lookup(&self, identity: &str) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions.get(identity).cloned()
    }

    /// Connected drones, sorted by identity
    pub async fn snapshot_drones(&self) -> BTreeMap<String, &'static str> {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|s| s.role == Role::Drone)
            .map(|s| (s.identity.clone(), DRONE_CONNECTED))
            .collect()
    }

    /// Handles of every registered operator
    pub async fn all_operators(&self) -> Vec<SessionHandle> {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|s| s.role == Role::Operator)
            .map(|s| s.handle.clone())
            .collect()
    }

    /// Identity and handle of every registered drone
    pub async fn all_drones(&self) -> Vec<(String, SessionHandle)> {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|s| s.role == Role::Drone)
            .map(|s| (s.identity.clone(), s.handle.clone()))
            .collect()
    }

    /// Remove every session of `role` whose connection has closed and return
    /// their identities.
    ///
    /// Scan and removal happen under one write lock, so a session that was
    /// re-registered on a fresh connection is never evicted by mistake.
    pub async fn remove_closed(&self, role: Role) -> Vec<String> {
        let mut sessions = self.sessions.write().await;
        let mut dead: Vec<String> = sessions
            .values()
            .filter(|s| s.role == role && s.handle.is_closed())
            .map(|s| s.identity.clone())
            .collect();
        dead.sort();

        for identity in &dead {
            sessions.remove(identity);
        }
        dead
    }

    /// Get the number of registered sessions
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::connection::test_handle;

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = SessionRegistry::new();
        let (handle, _rx) = test_handle(4);

        assert!(registry.register("drone1", Role::Drone, handle.clone()).await.is_none());

        let session = registry.lookup("drone1").await.expect("not registered");
        assert_eq!(session.role, Role::Drone);
        assert_eq!(session.handle.conn_id, handle.conn_id);
        assert!(session.connected_at.elapsed() < std::time::Duration::from_secs(5));
        assert!(registry.lookup("drone2").await.is_none());
    }

    #[tokio::test]
    async fn test_second_login_overwrites() {
        let registry = SessionRegistry::new();
        let (first, first_rx) = test_handle(4);
        let (second, _rx) = test_handle(4);

        registry.register("user1", Role::Operator, first.clone()).await;
        let replaced = registry
            .register("user1", Role::Operator, second.clone())
            .await
            .expect("should replace");

        assert_eq!(replaced.handle.conn_id, first.conn_id);
        assert_eq!(registry.count().await, 1);
        assert_eq!(
            registry.lookup("user1").await.map(|s| s.handle.conn_id),
            Some(second.conn_id)
        );
        // Replacement does not close the earlier connection
        assert!(!first.is_closed());
        drop(first_rx);
    }

    #[tokio::test]
    async fn test_unregister_is_noop_when_absent() {
        let registry = SessionRegistry::new();
        let (handle, _rx) = test_handle(4);

        assert!(registry.unregister("drone1").await.is_none());

        registry.register("drone1", Role::Drone, handle).await;
        assert!(registry.unregister("drone1").await.is_some());
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_snapshot_and_role_views() {
        let registry = SessionRegistry::new();
        let (d1, _r1) = test_handle(4);
        let (d2, _r2) = test_handle(4);
        let (u1, _r3) = test_handle(4);
        let (x, _r4) = test_handle(4);

        registry.register("drone2", Role::Drone, d2).await;
        registry.register("drone1", Role::Drone, d1).await;
        registry.register("user1", Role::Operator, u1.clone()).await;
        registry.register("admin", Role::Unclassified, x).await;

        let snapshot = registry.snapshot_drones().await;
        let keys: Vec<&str> = snapshot.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["drone1", "drone2"]);
        assert!(snapshot.values().all(|v| *v == DRONE_CONNECTED));

        let operators = registry.all_operators().await;
        assert_eq!(operators.len(), 1);
        assert_eq!(operators[0].conn_id, u1.conn_id);

        let mut drones: Vec<String> = registry
            .all_drones()
            .await
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        drones.sort();
        assert_eq!(drones, vec!["drone1", "drone2"]);
    }

    #[tokio::test]
    async fn test_remove_closed_only_touches_role() {
        let registry = SessionRegistry::new();
        let (drone, drone_rx) = test_handle(4);
        let (user, user_rx) = test_handle(4);
        let (live, _live_rx) = test_handle(4);

        registry.register("drone1", Role::Drone, drone).await;
        registry.register("drone2", Role::Drone, live).await;
        registry.register("user1", Role::Operator, user).await;

        drop(drone_rx);
        drop(user_rx);

        assert_eq!(registry.remove_closed(Role::Drone).await, vec!["drone1"]);
        assert!(registry.lookup("drone1").await.is_none());
        assert!(registry.lookup("drone2").await.is_some());
        assert!(registry.lookup("user1").await.is_some());

        assert_eq!(registry.remove_closed(Role::Operator).await, vec!["user1"]);
        assert_eq!(registry.count().await, 1);
    }
}
