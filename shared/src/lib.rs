//! Drone Relay Shared Protocol Types
//!
//! This crate provides the text frame protocol spoken between drones,
//! operators and the relay server, plus the timing parameters both sides
//! agree on.

pub mod codec;

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

pub use codec::{ClientFrame, CodecError, RelayFrame};

/// Get current timestamp in seconds since Unix epoch
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Timing parameters for the relay protocol
pub mod timing {
    /// Lifetime of an issued token
    pub const TOKEN_TTL_SECS: u64 = 3600;

    /// Budget for processing a single inbound frame
    pub const MESSAGE_TIMEOUT_MS: u64 = 5000;

    /// Period of the dead-connection sweep
    pub const SWEEP_INTERVAL_MS: u64 = 10000;
}

/// Role of an authenticated identity, inferred from its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Drone,
    Operator,
    /// Passed the credential check but matches neither naming rule
    Unclassified,
}

impl Role {
    pub const DRONE_PREFIX: &'static str = "drone";
    pub const OPERATOR_PREFIX: &'static str = "user";

    /// Classify an identity: `drone*` is a drone, `user*` is an operator
    pub fn from_identity(identity: &str) -> Self {
        if identity.starts_with(Self::DRONE_PREFIX) {
            Role::Drone
        } else if identity.starts_with(Self::OPERATOR_PREFIX) {
            Role::Operator
        } else {
            Role::Unclassified
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Drone => write!(f, "drone"),
            Role::Operator => write!(f, "operator"),
            Role::Unclassified => write!(f, "unclassified"),
        }
    }
}
