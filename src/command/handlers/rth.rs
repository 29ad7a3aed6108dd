//! Return-to-Home command handler

use super::HandlerContext;
use crate::command::{CommandResult, FlightState};
use tracing::info;

/// Handle RTH (Return-to-Home) command
///
/// RTH is a safety-critical command that should be accepted in almost any state
pub fn handle_rth(ctx: &HandlerContext) -> CommandResult {
    match ctx.current_state {
        FlightState::Idle => CommandResult::Rejected {
            message: "Drone is not flying, RTH not needed".into(),
        },
        FlightState::ReturningHome => CommandResult::Completed {
            message: "Already returning home".into(),
            state: FlightState::ReturningHome,
        },
        FlightState::Airborne | FlightState::Emergency => {
            info!("  [RTH] {} returning home", ctx.identity);
            CommandResult::Completed {
                message: "RTH initiated".into(),
                state: FlightState::ReturningHome,
            }
        }
    }
}
