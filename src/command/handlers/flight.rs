//! Takeoff and landing handlers

use super::HandlerContext;
use crate::command::{CommandResult, FlightState};

/// Handle TAKEOFF
pub fn handle_takeoff(ctx: &HandlerContext) -> CommandResult {
    match ctx.current_state {
        FlightState::Idle => CommandResult::Completed {
            message: "Taking off".into(),
            state: FlightState::Airborne,
        },
        FlightState::Airborne => CommandResult::Completed {
            message: "Already airborne".into(),
            state: FlightState::Airborne,
        },
        FlightState::ReturningHome => CommandResult::Rejected {
            message: "Drone is returning home".into(),
        },
        FlightState::Emergency => CommandResult::Rejected {
            message: "Emergency stop active, land first".into(),
        },
    }
}

/// Handle LAND
///
/// Accepted from any flying state, including after an emergency stop.
pub fn handle_land(ctx: &HandlerContext) -> CommandResult {
    match ctx.current_state {
        FlightState::Idle => CommandResult::Rejected {
            message: "Drone is not flying".into(),
        },
        _ => CommandResult::Completed {
            message: "Landing".into(),
            state: FlightState::Idle,
        },
    }
}
