//! TOML configuration for the purchase client.

use std::path::Path;

use alloy::primitives::Address;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::decryption::DEFAULT_DURATION_DAYS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// HTTP RPC endpoint.
    pub rpc_url: String,
    pub chain_id: u64,
    /// Hex-encoded private key of the connected account.
    pub private_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractConfig {
    /// Purchase manager contract address.
    pub address: Address,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayerConfig {
    /// Base URL of the FHE relayer.
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecryptConfig {
    /// Validity window of signed decryption requests, in days.
    #[serde(default = "default_duration_days")]
    pub duration_days: u64,
}

impl Default for DecryptConfig {
    fn default() -> Self {
        Self {
            duration_days: DEFAULT_DURATION_DAYS,
        }
    }
}

fn default_duration_days() -> u64 {
    DEFAULT_DURATION_DAYS
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub chain: ChainConfig,
    pub contract: ContractConfig,
    pub relayer: RelayerConfig,
    #[serde(default)]
    pub decrypt: DecryptConfig,
}

impl ClientConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain.rpc_url.is_empty() {
            return Err(ConfigError::Validation("chain.rpc_url is empty".into()));
        }
        if !self.chain.private_key.starts_with("0x") {
            return Err(ConfigError::Validation(
                "chain.private_key must be 0x-prefixed".into(),
            ));
        }
        if self.relayer.url.is_empty() {
            return Err(ConfigError::Validation("relayer.url is empty".into()));
        }
        if self.decrypt.duration_days == 0 {
            return Err(ConfigError::Validation(
                "decrypt.duration_days must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
