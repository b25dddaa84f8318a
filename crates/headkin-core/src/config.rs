//! # Configuration System
//!
//! YAML configuration for the preprocessing pipeline:
//!
//! - Augmentation (tensor length, peak target, padding, conjugation)
//! - Optional Butterworth cleaning
//! - DAMAGE model constants and ODE solver settings
//! - UBrIC critical values
//! - Input column selection and the metadata directory
//! - Logging
//!
//! ## Configuration Search Path
//!
//! Configuration is loaded from the first file found:
//! 1. Path specified via `HEADKIN_CONFIG` environment variable
//! 2. `./headkin.yaml` (current directory)
//! 3. `~/.config/headkin/config.yaml` (user config)
//! 4. `/etc/headkin/config.yaml` (system config)
//!
//! ## Example Configuration
//!
//! ```yaml
//! augment:
//!   cnn_length: 550
//!   pad_mode: repeat
//!
//! filter:
//!   enabled: true
//!   cutoff_hz: 300.0
//!   sample_rate_hz: 3200.0
//!
//! damage:
//!   method: trapezoid
//!   solver:
//!     rtol: 1.0e-6
//! ```

use crate::damage::{DamageIntegrator, DamageParams};
use crate::filter::FilterConfig;
use crate::logging::LogConfig;
use crate::ode::{SolverMethod, SolverOptions};
use crate::pipeline::AugmentConfig;
use crate::types::PreprocessResult;
use crate::ubric::{UbricParams, UbricScorer};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Error type for configuration operations.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Failed to read or write a configuration file
    ReadError(String),
    /// Failed to parse configuration
    ParseError(String),
    /// Invalid configuration value
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(msg) => write!(f, "failed to read config: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "failed to parse config: {}", msg),
            ConfigError::ValidationError(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// DAMAGE model and solver selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DamageConfig {
    /// Model constants
    pub params: DamageParams,
    /// ODE method (rk45, trapezoid)
    pub method: SolverMethod,
    /// Tolerances and limits
    pub solver: SolverOptions,
}

impl DamageConfig {
    /// Build the integrator this section describes.
    pub fn integrator(&self) -> PreprocessResult<DamageIntegrator> {
        DamageIntegrator::new(self.params, self.method, self.solver)
    }
}

/// Which CSV columns feed each stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    /// Column positions of the profile to augment
    pub augment_indices: Vec<usize>,
    /// Column names of angular acceleration (rad/s²) for scoring
    pub angular_acceleration: Vec<String>,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            augment_indices: vec![4, 5, 6],
            angular_acceleration: vec![
                "ang_x".to_string(),
                "ang_y".to_string(),
                "ang_z".to_string(),
            ],
        }
    }
}

/// Label lookup settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Directory holding `metadata_<suffix>[_<n>].csv`
    pub dir: PathBuf,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/metadata"),
        }
    }
}

/// Complete headkin configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HeadkinConfig {
    /// Augmentation settings
    pub augment: AugmentConfig,
    /// Pre-augmentation filtering
    pub filter: FilterConfig,
    /// DAMAGE settings
    pub damage: DamageConfig,
    /// UBrIC critical values
    pub ubric: UbricParams,
    /// Input columns
    pub columns: ColumnConfig,
    /// Metadata lookup
    pub metadata: MetadataConfig,
    /// Logging configuration
    pub logging: LogConfig,
}

impl HeadkinConfig {
    /// Load configuration from the default search path.
    ///
    /// Returns default config if no file is found.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var("HEADKIN_CONFIG") {
            if Path::new(&path).exists() {
                return Self::load_from(Path::new(&path));
            }
        }

        for path in &Self::config_search_paths() {
            if path.exists() {
                return Self::load_from(path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        Self::parse(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_yaml()?)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Get configuration search paths.
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./headkin.yaml")];

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "headkin") {
            paths.push(config_dir.config_dir().join("config.yaml"));
        }

        paths.push(PathBuf::from("/etc/headkin/config.yaml"));

        paths
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |e: crate::types::PreprocessError| ConfigError::ValidationError(e.to_string());

        self.augment.validate().map_err(invalid)?;
        if self.filter.enabled {
            self.filter.validate().map_err(invalid)?;
        }
        self.damage.params.validate().map_err(invalid)?;
        self.damage.solver.validate().map_err(invalid)?;
        self.ubric.validate().map_err(invalid)?;

        if self.columns.augment_indices.len() != 3 {
            return Err(ConfigError::ValidationError(
                "augment_indices must name exactly 3 columns".to_string(),
            ));
        }
        if self.columns.angular_acceleration.len() != 3 {
            return Err(ConfigError::ValidationError(
                "angular_acceleration must name exactly 3 columns".to_string(),
            ));
        }

        Ok(())
    }

    /// UBrIC scorer for the configured critical values.
    pub fn ubric_scorer(&self) -> PreprocessResult<UbricScorer> {
        UbricScorer::new(self.ubric)
    }

    /// Generate example configuration YAML.
    pub fn example_yaml() -> String {
        let config = Self {
            filter: FilterConfig {
                enabled: true,
                ..Default::default()
            },
            augment: AugmentConfig {
                target_index: Some(275),
                ..Default::default()
            },
            ..Default::default()
        };

        serde_yaml::to_string(&config).unwrap_or_default()
    }
}
