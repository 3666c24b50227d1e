use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::acwr::AcwrConfig;
use crate::alerts::AlertConfig;
use crate::error::LoadWatchError;
use crate::logging::LogConfig;
use crate::pipeline::PipelineConfig;
use crate::readiness::ReadinessConfig;
use crate::variability::VariabilityConfig;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application metadata
    pub metadata: ConfigMetadata,

    /// Acute:chronic workload ratio windows
    pub acwr: AcwrConfig,

    /// Weekly monotony / strain settings
    pub variability: VariabilityConfig,

    /// Readiness weights, scale and baseline window
    pub readiness: ReadinessConfig,

    /// Alert thresholds
    pub alerts: AlertConfig,

    /// Logging output
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();

        AppConfig {
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            acwr: AcwrConfig::default(),
            variability: VariabilityConfig::default(),
            readiness: ReadinessConfig::default(),
            alerts: AlertConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".loadwatch")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(
                    path = %config_path.display(),
                    error = %e,
                    "No usable config file, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Settings for the analytics pipeline
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            acwr: self.acwr.clone(),
            variability: self.variability.clone(),
            readiness: self.readiness.clone(),
            alerts: self.alerts.clone(),
        }
    }

    /// Reject settings the calculators cannot work with
    pub fn validate(&self) -> crate::error::Result<()> {
        let invalid = |msg: &str| Err(LoadWatchError::Configuration(msg.to_string()));

        if self.acwr.short_window == 0 || self.acwr.long_window == 0 {
            return invalid("acwr windows must be at least one entry");
        }
        if self.variability.min_days_per_week < 2 {
            return invalid("variability.min_days_per_week must be at least 2");
        }
        if !(self.variability.std_floor > 0.0) {
            return invalid("variability.std_floor must be positive");
        }
        if self.readiness.baseline.window_days == 0 || self.readiness.baseline.min_samples == 0 {
            return invalid("readiness.baseline window and sample count must be positive");
        }
        if !(self.readiness.weights.total() > 0.0) {
            return invalid("readiness weights must sum to a positive value");
        }
        if !(self.readiness.scale > 0.0) {
            return invalid("readiness.scale must be positive");
        }
        if self.alerts.acwr_low >= self.alerts.acwr_high {
            return invalid("alerts.acwr_low must be below alerts.acwr_high");
        }
        if self.alerts.readiness_run_length == 0 {
            return invalid("alerts.readiness_run_length must be at least 1");
        }
        if !(self.alerts.outlier_z_threshold > 0.0) {
            return invalid("alerts.outlier_z_threshold must be positive");
        }

        Ok(())
    }
}
