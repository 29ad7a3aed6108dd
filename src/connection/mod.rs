//! Connection management for the persistent relay link
//!
//! This module handles:
//! - The WebSocket link to the relay with automatic reconnection
//! - Logging in as a drone on every (re)connect
//! - Bidirectional frame streaming
//! - Periodic heartbeat status updates

mod manager;

pub use manager::{ConnectionConfig, ConnectionEvent, ConnectionManager};
