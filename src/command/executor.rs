//! Command executor - validates and dispatches forwarded commands

use super::handlers::{self, HandlerContext};
use dronerelay_shared::ClientFrame;
use std::fmt;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Flight state tracked by the drone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightState {
    Idle,
    Airborne,
    ReturningHome,
    Emergency,
}

impl fmt::Display for FlightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlightState::Idle => "Idle",
            FlightState::Airborne => "Airborne",
            FlightState::ReturningHome => "ReturningHome",
            FlightState::Emergency => "Emergency",
        };
        f.write_str(name)
    }
}

/// Result of command execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Command accepted; the drone is now in `state`
    Completed { message: String, state: FlightState },
    /// Command rejected, state unchanged
    Rejected { message: String },
}

/// Executes commands forwarded by the relay
pub struct CommandExecutor {
    identity: String,
    current_state: RwLock<FlightState>,
}

impl CommandExecutor {
    /// Create a new command executor
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            current_state: RwLock::new(FlightState::Idle),
        }
    }

    /// Get the current flight state
    pub async fn get_state(&self) -> FlightState {
        *self.current_state.read().await
    }

    /// Execute a command and return the status update reporting the outcome
    pub async fn execute(&self, command: &str) -> ClientFrame {
        let command = command.trim();
        let verb = command.split_whitespace().next().unwrap_or_default();

        let mut state = self.current_state.write().await;
        let ctx = HandlerContext {
            identity: self.identity.clone(),
            current_state: *state,
        };

        info!("Executing command: {}", command);

        let result = match verb {
            "TAKEOFF" => handlers::handle_takeoff(&ctx),
            "LAND" => handlers::handle_land(&ctx),
            "RTH" => handlers::handle_rth(&ctx),
            "EMERGENCY_STOP" => handlers::handle_emergency_stop(&ctx),
            "STATUS" => handlers::handle_status_request(&ctx),
            _ => CommandResult::Rejected {
                message: "Unknown command".into(),
            },
        };

        let text = match result {
            CommandResult::Completed {
                message,
                state: next,
            } => {
                info!("  Command completed: {}", message);
                *state = next;
                format!("{} {} completed: {} (state={})", self.identity, verb, message, next)
            }
            CommandResult::Rejected { message } => {
                warn!("  Command rejected: {}", message);
                format!("{} {} rejected: {} (state={})", self.identity, command, message, *state)
            }
        };

        ClientFrame::StatusUpdate { text }
    }
}
