//! Relay error taxonomy
//!
//! The `Display` text of each variant is exactly what follows `ERROR: ` in
//! the reply sent back to the client.

use dronerelay_shared::CodecError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid or expired token")]
    ExpiredToken,

    #[error("Drone {0} is not connected")]
    DroneUnavailable(String),

    #[error("Unknown command")]
    UnknownMessage,

    #[error("{0}")]
    MalformedFrame(String),

    #[error("Operation timed out")]
    OperationTimeout,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Outbound queue full")]
    QueueFull,

    #[error("Internal server error")]
    Internal(String),
}

impl From<CodecError> for RelayError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::UnknownTag => RelayError::UnknownMessage,
            other => RelayError::MalformedFrame(other.to_string()),
        }
    }
}
