//! Emergency stop handler

use super::HandlerContext;
use crate::command::{CommandResult, FlightState};
use tracing::error;

/// Handle EMERGENCY_STOP, accepted in every state
pub fn handle_emergency_stop(ctx: &HandlerContext) -> CommandResult {
    error!("  [EMERGENCY] {} stopping from {}", ctx.identity, ctx.current_state);
    CommandResult::Completed {
        message: "Emergency stop".into(),
        state: FlightState::Emergency,
    }
}
