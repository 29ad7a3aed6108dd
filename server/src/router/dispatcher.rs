//! Message router: parses inbound frames and dispatches them to handlers

use crate::auth::{CredentialStore, TokenService};
use crate::broadcast::{BroadcastNotifier, OperatorObserver};
use crate::error::RelayError;
use crate::session::{SessionHandle, SessionRegistry};
use dronerelay_shared::{ClientFrame, RelayFrame, Role};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Routes LOGIN, COMMAND and STATUS_UPDATE frames.
///
/// Authorization is checked per frame through the token, not per
/// connection, so any connection may send any frame.
pub struct MessageRouter {
    tokens: Arc<TokenService>,
    credentials: Arc<CredentialStore>,
    registry: Arc<SessionRegistry>,
    notifier: Arc<BroadcastNotifier>,
    message_timeout: Duration,
}

impl MessageRouter {
    /// Create a new message router
    pub fn new(
        tokens: Arc<TokenService>,
        credentials: Arc<CredentialStore>,
        registry: Arc<SessionRegistry>,
        notifier: Arc<BroadcastNotifier>,
        message_timeout: Duration,
    ) -> Self {
        Self {
            tokens,
            credentials,
            registry,
            notifier,
            message_timeout,
        }
    }

    /// Process one inbound frame within the time budget.
    ///
    /// Any failure, including running out of time, becomes a single `ERROR:`
    /// reply to `origin`. Work already done when the budget runs out (a
    /// registered session, sends already queued) is kept.
    pub async fn handle_frame(&self, raw: &str, origin: &SessionHandle) {
        let outcome = match timeout(self.message_timeout, self.dispatch(raw, origin)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(RelayError::OperationTimeout),
        };

        let err = match outcome {
            Ok(()) => return,
            Err(err) => err,
        };

        match &err {
            RelayError::OperationTimeout => warn!("Frame from {} timed out", origin.addr),
            RelayError::Internal(detail) => warn!("Frame from {} failed: {}", origin.addr, detail),
            other => debug!("Rejected frame from {}: {}", origin.addr, other),
        }

        let reply = RelayFrame::Error(err.to_string());
        match timeout(self.message_timeout, origin.send(&reply)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Could not reply to {}: {}", origin.addr, e),
            Err(_) => warn!("Error reply to {} timed out", origin.addr),
        }
    }

    /// Parse and route one frame without a deadline
    pub async fn dispatch(&self, raw: &str, origin: &SessionHandle) -> Result<(), RelayError> {
        match ClientFrame::parse(raw)? {
            ClientFrame::Login { identity, password } => {
                self.handle_login(&identity, &password, origin).await
            }
            ClientFrame::Command {
                token,
                drone,
                command,
            } => self.handle_command(&token, &drone, &command, origin).await,
            ClientFrame::StatusUpdate { text } => {
                self.handle_status_update(&text).await;
                Ok(())
            }
        }
    }

    async fn handle_login(
        &self,
        identity: &str,
        password: &str,
        origin: &SessionHandle,
    ) -> Result<(), RelayError> {
        info!("Login attempt: {}", identity);

        if !self.credentials.check(identity, password) {
            warn!("Rejected login for {} from {}", identity, origin.addr);
            return Err(RelayError::InvalidCredentials);
        }

        let token = self.tokens.issue(identity)?;
        origin.send(&RelayFrame::Jwt(token)).await?;
        debug!("Token issued to {}", identity);

        let role = Role::from_identity(identity);
        if let Some(previous) = self.registry.register(identity, role, origin.clone()).await {
            if previous.handle.conn_id != origin.conn_id {
                warn!(
                    "{} logged in again from {}; session from {} replaced",
                    identity, origin.addr, previous.handle.addr
                );
            }
        }

        match role {
            Role::Drone => info!("Drone {} connected", identity),
            Role::Operator => {
                let observer = OperatorObserver::new(identity, origin.clone());
                self.notifier.subscribe(Arc::new(observer)).await;
                info!("Operator {} connected", identity);
            }
            Role::Unclassified => {
                info!("{} authenticated without a drone or operator role", identity);
                return Ok(());
            }
        }

        self.notifier
            .notify_status(&RelayFrame::Connected(identity.to_string()))
            .await;
        Ok(())
    }

    async fn handle_command(
        &self,
        token: &str,
        drone: &str,
        command: &str,
        origin: &SessionHandle,
    ) -> Result<(), RelayError> {
        let sender = self.tokens.verify(token)?;
        info!("Command received: {} for {} from {}", command, drone, sender);

        let target = self
            .registry
            .lookup(drone)
            .await
            .filter(|session| session.role == Role::Drone)
            .ok_or_else(|| RelayError::DroneUnavailable(drone.to_string()))?;

        // Closed but not yet reaped
        target
            .handle
            .send(&RelayFrame::Command(command.to_string()))
            .await
            .map_err(|_| RelayError::DroneUnavailable(drone.to_string()))?;

        origin
            .send(&RelayFrame::Authorized(format!(
                "Command {} sent to drone {}",
                command, drone
            )))
            .await
    }

    async fn handle_status_update(&self, text: &str) {
        info!("Status update: {}", text);
        self.notifier
            .notify_status(&RelayFrame::StatusUpdate(text.to_string()))
            .await;
    }
}
