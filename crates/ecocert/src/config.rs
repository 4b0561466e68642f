//! TOML configuration for the certification engine.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::{Height, Principal};

/// Roughly one year of heights at ten-minute intervals.
pub const DEFAULT_VALIDITY_PERIOD: Height = 52_560;

/// Top-level engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// The single principal allowed to manage auditors. Fixed for the
    /// lifetime of the engine.
    pub registry_owner: String,
    /// Heights added to the current height to compute certification expiry.
    #[serde(default = "default_validity_period")]
    pub validity_period: Height,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// SQLite database path. Absent means in-memory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_validity_period() -> Height {
    DEFAULT_VALIDITY_PERIOD
}

impl EngineConfig {
    pub fn new(registry_owner: Principal) -> Self {
        Self {
            registry_owner: registry_owner.to_string(),
            validity_period: DEFAULT_VALIDITY_PERIOD,
            storage: StorageConfig::default(),
        }
    }

    pub fn with_validity_period(mut self, validity_period: Height) -> Self {
        self.validity_period = validity_period;
        self
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| Error::Config(format!("Invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read config file: {e}")))?;
        Self::parse(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.registry_owner.trim().is_empty() {
            return Err(Error::Config("registry_owner must not be empty".into()));
        }
        if self.validity_period == 0 {
            return Err(Error::Config(
                "validity_period must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn owner(&self) -> Result<Principal> {
        Principal::new(self.registry_owner.clone())
            .map_err(|_| Error::Config("registry_owner must not be empty".into()))
    }
}
