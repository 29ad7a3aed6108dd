//! Command execution for the drone endpoint
//!
//! This module handles:
//! - Receiving commands forwarded by the relay
//! - Dispatching to the handler for each command verb
//! - Tracking the flight state and reporting outcomes as status updates

mod executor;
pub mod handlers;

pub use executor::{CommandExecutor, CommandResult, FlightState};
