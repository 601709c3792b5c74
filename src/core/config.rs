//! Configuration for the stats registry and export driver.
//!
//! Supports YAML files, programmatic construction through a builder, and
//! validation with sensible defaults.

use crate::core::{Result, SightlineError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete configuration for a sightline stats component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// View registry configuration
    pub registry: RegistryConfig,
    /// Export driver configuration
    pub export: ExportConfig,
}

/// View registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Maximum tag-value combinations retained per view. Rows arriving once
    /// a view is at this cap are dropped, not recorded.
    pub max_rows_per_view: usize,
}

/// Export driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Whether the periodic export driver should run
    pub enabled: bool,
    /// Interval between export ticks
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            registry: RegistryConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            max_rows_per_view: 2_000,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            enabled: false,
            interval: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Validates the configuration, rejecting values that would make the
    /// registry or export driver inoperable.
    pub fn validate(&self) -> Result<()> {
        if self.registry.max_rows_per_view == 0 {
            return Err(SightlineError::config(
                "registry.max_rows_per_view must be greater than zero",
            ));
        }
        if self.export.interval.is_zero() {
            return Err(SightlineError::config(
                "export.interval must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Builder for [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML string, replacing current values.
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| SightlineError::config(format!("failed to parse YAML: {}", e)))?;
        Ok(self)
    }

    /// Sets the per-view row cardinality cap.
    pub fn max_rows_per_view(mut self, max: usize) -> Self {
        self.config.registry.max_rows_per_view = max;
        self
    }

    /// Enables or disables the periodic export driver.
    pub fn export_enabled(mut self, enabled: bool) -> Self {
        self.config.export.enabled = enabled;
        self
    }

    /// Sets the export tick interval.
    pub fn export_interval(mut self, interval: Duration) -> Self {
        self.config.export.interval = interval;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
