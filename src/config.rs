// src/config.rs
//! Runtime settings for the API server binary.
//!
//! Sources, later ones overriding earlier ones:
//! 1. Built-in defaults
//! 2. An optional `config.{toml,json,yaml}` file in the working directory
//! 3. `SBT_`-prefixed environment variables (e.g. `SBT_BIND_ADDRESS`)

use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, ConfigError, Environment, File};
use ethers_core::types::Address;
use serde::Deserialize;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Socket address the HTTP API binds to
    pub bind_address: String,

    /// Platform administrator; defaults to the server wallet
    #[serde(default)]
    pub admin_address: Option<String>,

    /// Hex-encoded secp256k1 key of the server wallet; random if unset
    #[serde(default)]
    pub private_key: Option<String>,

    /// IPFS HTTP API; metadata is kept in memory if unset
    #[serde(default)]
    pub ipfs_api_url: Option<String>,

    /// Upper bound on metadata fetches during verification
    pub fetch_timeout_ms: u64,
}

impl Settings {
    /// Loads settings from defaults, the optional config file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("SBT"))
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("bind_address", "127.0.0.1:3000")?
            .set_default("fetch_timeout_ms", 3_000_i64)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        SocketAddr::from_str(&self.bind_address)
            .map_err(|e| ConfigError::Message(format!("bind_address {:?}: {}", self.bind_address, e)))
    }

    /// The configured administrator, or `fallback` when none is set.
    pub fn admin(&self, fallback: Address) -> Result<Address, ConfigError> {
        match self.admin_address.as_deref() {
            None => Ok(fallback),
            Some(raw) => {
                let bare = raw.trim().strip_prefix("0x").unwrap_or(raw.trim());
                Address::from_str(bare)
                    .map_err(|e| ConfigError::Message(format!("admin_address {:?}: {}", raw, e)))
            }
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}
