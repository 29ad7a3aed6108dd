//! Authentication for the relay
//!
//! This module handles:
//! - Checking LOGIN credentials against the static table
//! - Issuing and verifying signed bearer tokens for COMMAND frames

mod credentials;
mod token;

pub use credentials::CredentialStore;
pub use token::{Claims, TokenService};
