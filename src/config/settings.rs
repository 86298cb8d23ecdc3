//! Application settings loading from config.toml and environment variables.
//!
//! Reward policy (credit expiry) lives in an optional `config.toml`; the bind
//! address and database URL come from the environment. Missing file or fields
//! fall back to defaults so a bare checkout can still run.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Default lifetime of a minted credit instrument, per reward policy.
pub const DEFAULT_CREDIT_EXPIRY_DAYS: i64 = 365;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    /// Reward settlement policy
    #[serde(default)]
    pub rewards: RewardPolicy,
}

/// Settlement policy for minted credit instruments
#[derive(Debug, Deserialize, Clone)]
pub struct RewardPolicy {
    /// Days until a minted credit instrument expires
    #[serde(default = "default_expiry_days")]
    pub credit_expiry_days: i64,
}

const fn default_expiry_days() -> i64 {
    DEFAULT_CREDIT_EXPIRY_DAYS
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            credit_expiry_days: DEFAULT_CREDIT_EXPIRY_DAYS,
        }
    }
}

/// Fully resolved application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to
    pub bind_addr: String,
    /// Reward settlement policy
    pub rewards: RewardPolicy,
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if the file exists but cannot be read, or its TOML is invalid.
pub fn load_file_config<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
    if !path.as_ref().exists() {
        return Ok(FileConfig::default());
    }

    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads the full application configuration from ./config.toml plus environment.
///
/// # Errors
/// Returns an error if config.toml is present but malformed.
pub fn load_app_configuration() -> Result<AppConfig> {
    let file = load_file_config("config.toml")?;
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    Ok(AppConfig {
        bind_addr,
        rewards: file.rewards,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_reward_policy() {
        let toml_str = r"
            [rewards]
            credit_expiry_days = 90
        ";

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.rewards.credit_expiry_days, 90);
    }

    #[test]
    fn test_defaults_when_section_missing() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config.rewards.credit_expiry_days, DEFAULT_CREDIT_EXPIRY_DAYS);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = load_file_config("does-not-exist.toml").unwrap();
        assert_eq!(config.rewards.credit_expiry_days, DEFAULT_CREDIT_EXPIRY_DAYS);
    }
}
