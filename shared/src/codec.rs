//! Text frame codec
//!
//! Every message is one UTF-8 WebSocket frame of the form:
//! ```text
//! <TAG>:<payload>
//! ```
//! Tags are case-sensitive and payload fields are comma-separated. Parsing
//! happens once at the connection boundary; everything past it works on
//! [`ClientFrame`] / [`RelayFrame`] values.

use std::fmt;
use thiserror::Error;

pub const LOGIN_TAG: &str = "LOGIN:";
pub const COMMAND_TAG: &str = "COMMAND:";
pub const STATUS_UPDATE_TAG: &str = "STATUS_UPDATE:";
pub const JWT_TAG: &str = "JWT:";
pub const AUTHORIZED_TAG: &str = "AUTHORIZED:";
pub const ERROR_TAG: &str = "ERROR:";
pub const DRONES_STATUS_TAG: &str = "DRONES_STATUS:";

/// Suffix of the connect notification broadcast after a login
const CONNECTED_SUFFIX: &str = ", connected";

/// Errors that can occur while parsing a frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Unknown command")]
    UnknownTag,

    #[error("Malformed {tag} frame: missing {field}")]
    MissingField {
        tag: &'static str,
        field: &'static str,
    },
}

/// Frames sent by drones and operators to the relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    /// `LOGIN:<identity>,<password>`
    Login { identity: String, password: String },
    /// `COMMAND:<token>,<drone>,<command>`
    Command {
        token: String,
        drone: String,
        command: String,
    },
    /// `STATUS_UPDATE:<text>`
    StatusUpdate { text: String },
}

impl ClientFrame {
    /// Parse a raw inbound frame
    pub fn parse(frame: &str) -> Result<Self, CodecError> {
        if let Some(payload) = frame.strip_prefix(LOGIN_TAG) {
            let (identity, password) = payload.split_once(',').ok_or(CodecError::MissingField {
                tag: "LOGIN",
                field: "password",
            })?;
            return Ok(ClientFrame::Login {
                identity: identity.to_string(),
                password: password.to_string(),
            });
        }

        if let Some(payload) = frame.strip_prefix(COMMAND_TAG) {
            // The command text is the remainder so it may itself contain commas
            let mut fields = payload.splitn(3, ',');
            let token = fields.next().unwrap_or_default();
            let drone = fields.next().ok_or(CodecError::MissingField {
                tag: "COMMAND",
                field: "drone identity",
            })?;
            let command = fields.next().ok_or(CodecError::MissingField {
                tag: "COMMAND",
                field: "command text",
            })?;
            return Ok(ClientFrame::Command {
                token: token.to_string(),
                drone: drone.to_string(),
                command: command.to_string(),
            });
        }

        if let Some(payload) = frame.strip_prefix(STATUS_UPDATE_TAG) {
            return Ok(ClientFrame::StatusUpdate {
                text: strip_one_space(payload).to_string(),
            });
        }

        Err(CodecError::UnknownTag)
    }

    /// Encode this frame into its wire text
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ClientFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientFrame::Login { identity, password } => {
                write!(f, "{LOGIN_TAG}{identity},{password}")
            }
            ClientFrame::Command {
                token,
                drone,
                command,
            } => write!(f, "{COMMAND_TAG}{token},{drone},{command}"),
            ClientFrame::StatusUpdate { text } => write!(f, "{STATUS_UPDATE_TAG} {text}"),
        }
    }
}

/// Frames sent by the relay to drones and operators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayFrame {
    /// Token issued after a successful login
    Jwt(String),
    /// Confirmation that a command was forwarded
    Authorized(String),
    /// Any user-visible failure
    Error(String),
    /// Command forwarded to a drone
    Command(String),
    /// Status text fanned out to operators
    StatusUpdate(String),
    /// Connect notification for a freshly logged-in identity
    Connected(String),
    /// Snapshot of connected drones, JSON encoded
    DronesStatus(String),
}

impl RelayFrame {
    /// Parse a raw frame received from the relay
    pub fn parse(frame: &str) -> Result<Self, CodecError> {
        if let Some(token) = frame.strip_prefix(JWT_TAG) {
            return Ok(RelayFrame::Jwt(token.to_string()));
        }
        if let Some(msg) = frame.strip_prefix(AUTHORIZED_TAG) {
            return Ok(RelayFrame::Authorized(strip_one_space(msg).to_string()));
        }
        if let Some(msg) = frame.strip_prefix(ERROR_TAG) {
            return Ok(RelayFrame::Error(strip_one_space(msg).to_string()));
        }
        if let Some(command) = frame.strip_prefix(COMMAND_TAG) {
            return Ok(RelayFrame::Command(command.to_string()));
        }
        if let Some(text) = frame.strip_prefix(STATUS_UPDATE_TAG) {
            return Ok(RelayFrame::StatusUpdate(text.to_string()));
        }
        if let Some(snapshot) = frame.strip_prefix(DRONES_STATUS_TAG) {
            return Ok(RelayFrame::DronesStatus(snapshot.to_string()));
        }
        if let Some(payload) = frame.strip_prefix(LOGIN_TAG) {
            let identity = payload.strip_suffix(CONNECTED_SUFFIX).unwrap_or(payload);
            return Ok(RelayFrame::Connected(identity.to_string()));
        }

        Err(CodecError::UnknownTag)
    }

    /// Encode this frame into its wire text
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RelayFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayFrame::Jwt(token) => write!(f, "{JWT_TAG}{token}"),
            RelayFrame::Authorized(msg) => write!(f, "{AUTHORIZED_TAG} {msg}"),
            RelayFrame::Error(msg) => write!(f, "{ERROR_TAG} {msg}"),
            RelayFrame::Command(command) => write!(f, "{COMMAND_TAG}{command}"),
            RelayFrame::StatusUpdate(text) => write!(f, "{STATUS_UPDATE_TAG}{text}"),
            RelayFrame::Connected(identity) => write!(f, "{LOGIN_TAG}{identity}{CONNECTED_SUFFIX}"),
            RelayFrame::DronesStatus(snapshot) => write!(f, "{DRONES_STATUS_TAG}{snapshot}"),
        }
    }
}

fn strip_one_space(s: &str) -> &str {
    s.strip_prefix(' ').unwrap_or(s)
}
