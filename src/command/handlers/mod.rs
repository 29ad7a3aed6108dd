//! Command handlers for different command verbs

mod emergency;
mod flight;
mod rth;
mod status;

pub use emergency::handle_emergency_stop;
pub use flight::{handle_land, handle_takeoff};
pub use rth::handle_rth;
pub use status::handle_status_request;

use super::FlightState;

/// Context passed to command handlers
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub identity: String,
    pub current_state: FlightState,
}
