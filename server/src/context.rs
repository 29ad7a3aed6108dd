//! Server context shared by every connection task and the reaper

use crate::auth::{CredentialStore, TokenService};
use crate::broadcast::BroadcastNotifier;
use crate::config::RelayConfig;
use crate::router::MessageRouter;
use crate::session::{ConnectionReaper, SessionRegistry};
use std::sync::Arc;

/// Everything the relay needs, built once at startup
pub struct RelayContext {
    pub config: RelayConfig,
    pub registry: Arc<SessionRegistry>,
    pub notifier: Arc<BroadcastNotifier>,
    pub router: MessageRouter,
}

impl RelayContext {
    pub fn new(config: RelayConfig) -> Arc<Self> {
        let tokens = Arc::new(TokenService::new(&config.secret, config.token_ttl));
        let credentials = Arc::new(CredentialStore::new(config.credentials.clone()));
        let registry = Arc::new(SessionRegistry::new());
        let notifier = Arc::new(BroadcastNotifier::new(
            registry.clone(),
            config.legacy_double_notify,
        ));
        let router = MessageRouter::new(
            tokens,
            credentials,
            registry.clone(),
            notifier.clone(),
            config.message_timeout,
        );

        Arc::new(Self {
            config,
            registry,
            notifier,
            router,
        })
    }

    /// Reaper sweeping this context's registry
    pub fn reaper(&self) -> ConnectionReaper {
        ConnectionReaper::new(
            self.registry.clone(),
            self.notifier.clone(),
            self.config.sweep_interval,
        )
    }
}
