//! Relay configuration and command-line flags

use anyhow::{anyhow, Result};
use clap::Parser;
use dronerelay_shared::timing;
use std::collections::HashMap;
use std::time::Duration;

/// Configuration for the relay server
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Listening endpoint (host:port)
    pub bind_addr: String,
    /// Shared secret used to sign tokens
    pub secret: String,
    /// Token lifetime
    pub token_ttl: Duration,
    /// Budget for processing one inbound frame
    pub message_timeout: Duration,
    /// Period of the dead-connection sweep
    pub sweep_interval: Duration,
    /// Outbound frames buffered per connection before senders wait
    pub outbound_queue: usize,
    /// Identity -> shared secret
    pub credentials: HashMap<String, String>,
    /// Re-invoke the observer list once per operator on every broadcast
    pub legacy_double_notify: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8765".into(),
            secret: "my_secret_key".into(),
            token_ttl: Duration::from_secs(timing::TOKEN_TTL_SECS),
            message_timeout: Duration::from_millis(timing::MESSAGE_TIMEOUT_MS),
            sweep_interval: Duration::from_millis(timing::SWEEP_INTERVAL_MS),
            outbound_queue: 64,
            credentials: default_credentials(),
            legacy_double_notify: false,
        }
    }
}

fn default_credentials() -> HashMap<String, String> {
    [
        ("user1", "111"),
        ("user2", "222"),
        ("drone1", "333"),
        ("drone2", "444"),
    ]
    .into_iter()
    .map(|(name, secret)| (name.to_string(), secret.to_string()))
    .collect()
}

/// Command-line flags for the relay server
#[derive(Debug, Parser)]
#[command(name = "dronerelay-server", version, about = "Drone/operator command relay")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "RELAY_BIND", default_value = "127.0.0.1:8765")]
    pub bind: String,

    /// Token signing secret
    #[arg(long, env = "RELAY_SECRET", default_value = "my_secret_key")]
    pub secret: String,

    /// Per-frame processing budget in milliseconds
    #[arg(long, default_value_t = timing::MESSAGE_TIMEOUT_MS)]
    pub message_timeout_ms: u64,

    /// Dead-connection sweep period in milliseconds
    #[arg(long, default_value_t = timing::SWEEP_INTERVAL_MS)]
    pub sweep_interval_ms: u64,

    /// Credential as NAME=SECRET; replaces the built-in table when given
    #[arg(long = "credential", value_name = "NAME=SECRET")]
    pub credentials: Vec<String>,

    /// Deliver the drone snapshot to every observer once per operator
    #[arg(long)]
    pub legacy_double_notify: bool,
}

impl Args {
    /// Build a relay configuration from the parsed flags
    pub fn into_config(self) -> Result<RelayConfig> {
        let mut config = RelayConfig {
            bind_addr: self.bind,
            secret: self.secret,
            message_timeout: Duration::from_millis(self.message_timeout_ms),
            sweep_interval: Duration::from_millis(self.sweep_interval_ms),
            legacy_double_notify: self.legacy_double_notify,
            ..Default::default()
        };

        if !self.credentials.is_empty() {
            config.credentials = self
                .credentials
                .iter()
                .map(|entry| parse_credential(entry))
                .collect::<Result<_>>()?;
        }

        Ok(config)
    }
}

fn parse_credential(entry: &str) -> Result<(String, String)> {
    let (name, secret) = entry
        .split_once('=')
        .ok_or_else(|| anyhow!("credential must be NAME=SECRET, got {:?}", entry))?;
    if name.is_empty() {
        return Err(anyhow!("credential name must not be empty"));
    }
    Ok((name.to_string(), secret.to_string()))
}
