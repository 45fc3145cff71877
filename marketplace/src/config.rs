//! Configuration management for the marketplace engine.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Every default reproduces the deployed contract's constants.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `NFTICKET_MAX_RESALE_PERCENTAGE` | `110` |
//! | `NFTICKET_ROYALTY_PERCENTAGE` | `5` |
//! | `NFTICKET_TRANSFER_COOLDOWN_SECS` (at most one year) | `86400` |
//! | `NFTICKET_SCAN_CEILING` | `1000` |
//! | `NFTICKET_PLATFORM_OWNER` | `platform-owner` |
//! | `NFTICKET_LOG_LEVEL` (falls back to `RUST_LOG`) | `info` |

use crate::discovery::DEFAULT_SCAN_CEILING;
use crate::policy::{
    MAX_RESALE_PERCENTAGE, MAX_TRANSFER_COOLDOWN_SECS, MarketPolicy, ROYALTY_PERCENTAGE,
    TRANSFER_COOLDOWN_SECS,
};
use crate::types::Identity;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Platform owner used when `NFTICKET_PLATFORM_OWNER` is unset.
pub const DEFAULT_PLATFORM_OWNER: &str = "platform-owner";

/// Configuration error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Discovery scan configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Maximum ids probed by one scan
    pub scan_ceiling: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            scan_ceiling: DEFAULT_SCAN_CEILING,
        }
    }
}

/// Platform configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Identity allowed to withdraw escrow and verify organizers
    pub owner: Identity,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            owner: Identity::new(DEFAULT_PLATFORM_OWNER),
        }
    }
}

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Resale cap, royalty and cooldown
    pub policy: MarketPolicy,
    /// Discovery scans
    pub discovery: DiscoveryConfig,
    /// Platform ownership
    pub platform: PlatformConfig,
    /// Log level (trace, debug, info, warn, error) or a full `EnvFilter` directive
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            policy: MarketPolicy::default(),
            discovery: DiscoveryConfig::default(),
            platform: PlatformConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the resulting configuration is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Unparseable values fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the resulting configuration is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config = Self {
            policy: MarketPolicy {
                max_resale_percentage: lookup("NFTICKET_MAX_RESALE_PERCENTAGE")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(MAX_RESALE_PERCENTAGE),
                royalty_percentage: lookup("NFTICKET_ROYALTY_PERCENTAGE")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(ROYALTY_PERCENTAGE),
                transfer_cooldown_secs: lookup("NFTICKET_TRANSFER_COOLDOWN_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(TRANSFER_COOLDOWN_SECS),
            },
            discovery: DiscoveryConfig {
                scan_ceiling: lookup("NFTICKET_SCAN_CEILING")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SCAN_CEILING),
            },
            platform: PlatformConfig {
                owner: lookup("NFTICKET_PLATFORM_OWNER")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| Identity::new(DEFAULT_PLATFORM_OWNER)),
            },
            log_level: lookup("NFTICKET_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or_else(|| "info".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if a percentage or limit is out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.policy.royalty_percentage > 100 {
            return Err(ConfigError::ValidationError(
                "royalty_percentage must be <= 100".to_string(),
            ));
        }
        if self.policy.max_resale_percentage < 100 {
            return Err(ConfigError::ValidationError(
                "max_resale_percentage must be >= 100".to_string(),
            ));
        }
        if self.policy.transfer_cooldown_secs < 0 {
            return Err(ConfigError::ValidationError(
                "transfer_cooldown_secs cannot be negative".to_string(),
            ));
        }
        if self.policy.transfer_cooldown_secs > MAX_TRANSFER_COOLDOWN_SECS {
            return Err(ConfigError::ValidationError(format!(
                "transfer_cooldown_secs must be <= {MAX_TRANSFER_COOLDOWN_SECS}"
            )));
        }
        if self.discovery.scan_ceiling == 0 {
            return Err(ConfigError::ValidationError("scan_ceiling must be > 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_contract_constants() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.policy.max_resale_percentage, 110);
        assert_eq!(config.policy.royalty_percentage, 5);
        assert_eq!(config.policy.transfer_cooldown_secs, 86_400);
        assert_eq!(config.discovery.scan_ceiling, 1000);
    }

    #[test]
    fn overrides_and_fallbacks() {
        let config = Config::from_lookup(lookup(&[
            ("NFTICKET_ROYALTY_PERCENTAGE", "10"),
            ("NFTICKET_SCAN_CEILING", "not-a-number"),
            ("NFTICKET_PLATFORM_OWNER", "0xowner"),
            ("RUST_LOG", "debug"),
        ]))
        .unwrap();
        assert_eq!(config.policy.royalty_percentage, 10);
        assert_eq!(config.discovery.scan_ceiling, 1000);
        assert_eq!(config.platform.owner, Identity::new("0xowner"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(Config::from_lookup(lookup(&[("NFTICKET_ROYALTY_PERCENTAGE", "101")])).is_err());
        assert!(Config::from_lookup(lookup(&[("NFTICKET_MAX_RESALE_PERCENTAGE", "99")])).is_err());
        assert!(Config::from_lookup(lookup(&[("NFTICKET_SCAN_CEILING", "0")])).is_err());
    }

    #[test]
    fn cooldown_is_bounded_both_ways() {
        let huge = i64::MAX.to_string();
        let error = Config::from_lookup(lookup(&[("NFTICKET_TRANSFER_COOLDOWN_SECS", huge.as_str())]))
            .unwrap_err();
        assert!(error.to_string().contains("transfer_cooldown_secs"));

        let just_over = (MAX_TRANSFER_COOLDOWN_SECS + 1).to_string();
        assert!(
            Config::from_lookup(lookup(&[("NFTICKET_TRANSFER_COOLDOWN_SECS", just_over.as_str())])).is_err()
        );
        assert!(Config::from_lookup(lookup(&[("NFTICKET_TRANSFER_COOLDOWN_SECS", "-1")])).is_err());

        let year = MAX_TRANSFER_COOLDOWN_SECS.to_string();
        let config =
            Config::from_lookup(lookup(&[("NFTICKET_TRANSFER_COOLDOWN_SECS", year.as_str())])).unwrap();
        assert_eq!(config.policy.transfer_cooldown().unwrap(), chrono::Duration::days(365));
    }
}
