//! Inbound frame routing for the relay
//!
//! This module handles:
//! - Parsing each frame into a typed message at the connection boundary
//! - LOGIN credential checks and token issuance
//! - COMMAND token verification and forwarding to drones
//! - STATUS_UPDATE fan-out
//! - The per-frame time budget

mod dispatcher;

pub use dispatcher::MessageRouter;
