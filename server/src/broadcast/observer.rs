//! Subscribers to drone status broadcasts

use crate::error::RelayError;
use crate::session::SessionHandle;
use async_trait::async_trait;
use dronerelay_shared::RelayFrame;

/// Something that wants to hear about drone status changes
#[async_trait]
pub trait StatusObserver: Send + Sync {
    /// Connection this observer delivers to
    fn conn_id(&self) -> u64;

    /// Name used in logs
    fn name(&self) -> &str;

    /// Deliver one status frame
    async fn update(&self, status: &RelayFrame) -> Result<(), RelayError>;
}

/// An operator connection subscribed at login
pub struct OperatorObserver {
    identity: String,
    handle: SessionHandle,
}

impl OperatorObserver {
    pub fn new(identity: impl Into<String>, handle: SessionHandle) -> Self {
        Self {
            identity: identity.into(),
            handle,
        }
    }
}

#[async_trait]
impl StatusObserver for OperatorObserver {
    fn conn_id(&self) -> u64 {
        self.handle.conn_id
    }

    fn name(&self) -> &str {
        &self.identity
    }

    async fn update(&self, status: &RelayFrame) -> Result<(), RelayError> {
        self.handle.try_send(status)
    }
}
