//! Session management for tracking authenticated connections
//!
//! This module handles:
//! - Per-connection reader/writer tasks and the handles used to reach them
//! - The registry of live sessions keyed by identity
//! - Periodic eviction of sessions whose connection has closed

mod connection;
mod manager;
mod reaper;

#[cfg(test)]
pub(crate) use connection::test_handle;
pub use connection::{serve, SessionHandle};
pub use manager::{Session, SessionRegistry, DRONE_CONNECTED};
pub use reaper::ConnectionReaper;
