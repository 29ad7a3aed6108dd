//! Drone relay core
//!
//! Relays authenticated text commands from operators to drones and fans
//! drone status out to every connected operator. Process startup lives in
//! the binary; everything here is reachable through [`RelayContext`] and
//! [`server::run`].

pub mod auth;
pub mod broadcast;
pub mod config;
pub mod context;
pub mod error;
pub mod router;
pub mod server;
pub mod session;

pub use context::RelayContext;
pub use error::RelayError;
