//! Engine configuration.
//!
//! # Configuration Sources
//!
//! Configuration can be loaded from:
//! - Environment variables (prefixed with `VOTESPLIT_`)
//! - Configuration files (JSON, via serde)
//! - Programmatic defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use votesplit_core::config::EngineConfig;
//!
//! let config = EngineConfig::builder()
//!     .denominator(10_000)
//!     .max_partial_delegations(16)
//!     .build()?;
//! ```

use crate::{Balance, Result, VotesError};
use serde::{Deserialize, Serialize};

/// Default share denominator (basis points).
pub const DEFAULT_DENOMINATOR: u32 = 10_000;

/// Default cap on entries per delegation set.
pub const DEFAULT_MAX_PARTIAL_DELEGATIONS: usize = 32;

/// Default supply cap: checkpoint values are 112 bits wide.
pub const DEFAULT_MAX_SUPPLY: Balance = (1u128 << 112) - 1;

/// Largest accepted denominator; keeps `remainder * share` inside 64 bits.
pub const MAX_DENOMINATOR: u32 = u16::MAX as u32;

/// Largest accepted `max_partial_delegations`.
pub const MAX_PARTIAL_DELEGATIONS_LIMIT: usize = 256;

/// Complete engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Fixed denominator that delegation shares are expressed against.
    pub denominator: u32,

    /// Maximum number of entries in a single delegation set.
    pub max_partial_delegations: usize,

    /// Upper bound on total supply (and therefore on any checkpoint value).
    pub max_supply: Balance,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            denominator: DEFAULT_DENOMINATOR,
            max_partial_delegations: DEFAULT_MAX_PARTIAL_DELEGATIONS,
            max_supply: DEFAULT_MAX_SUPPLY,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Looks for variables prefixed with `VOTESPLIT_`:
    /// - `VOTESPLIT_DENOMINATOR` - Share denominator
    /// - `VOTESPLIT_MAX_PARTIAL_DELEGATIONS` - Maximum entries per delegation set
    /// - `VOTESPLIT_MAX_SUPPLY` - Supply cap (decimal)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`EngineConfig::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("VOTESPLIT_DENOMINATOR") {
            config.denominator = v.trim().parse().map_err(|e| {
                VotesError::ConfigError(format!("Invalid VOTESPLIT_DENOMINATOR: {}", e))
            })?;
        }

        if let Some(v) = lookup("VOTESPLIT_MAX_PARTIAL_DELEGATIONS") {
            config.max_partial_delegations = v.trim().parse().map_err(|e| {
                VotesError::ConfigError(format!("Invalid VOTESPLIT_MAX_PARTIAL_DELEGATIONS: {}", e))
            })?;
        }

        if let Some(v) = lookup("VOTESPLIT_MAX_SUPPLY") {
            config.max_supply = v.trim().parse().map_err(|e| {
                VotesError::ConfigError(format!("Invalid VOTESPLIT_MAX_SUPPLY: {}", e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.denominator == 0 || self.denominator > MAX_DENOMINATOR {
            return Err(VotesError::ConfigError(format!(
                "denominator must be between 1 and {}",
                MAX_DENOMINATOR
            )));
        }

        if self.max_partial_delegations == 0
            || self.max_partial_delegations > MAX_PARTIAL_DELEGATIONS_LIMIT
        {
            return Err(VotesError::ConfigError(format!(
                "max_partial_delegations must be between 1 and {}",
                MAX_PARTIAL_DELEGATIONS_LIMIT
            )));
        }

        if self.max_supply == 0 {
            return Err(VotesError::ConfigError(
                "max_supply must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

/// Builder for EngineConfig.
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set the share denominator.
    pub fn denominator(mut self, denominator: u32) -> Self {
        self.config.denominator = denominator;
        self
    }

    /// Set the maximum delegation set length.
    pub fn max_partial_delegations(mut self, max: usize) -> Self {
        self.config.max_partial_delegations = max;
        self
    }

    /// Set the supply cap.
    pub fn max_supply(mut self, max_supply: Balance) -> Self {
        self.config.max_supply = max_supply;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<EngineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
