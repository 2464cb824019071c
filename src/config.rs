//! Configuration, persisted as TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration:
//!
//! ```toml
//! data_dir = "/var/lib/canon-kg"
//!
//! [resolver]
//! fuzzy_threshold = 80
//!
//! [inference]
//! max_iterations = 3
//! transitive_decay = 0.8
//! inheritance_decay = 0.8
//! apply_confidence_factors = false
//!
//! [tension]
//! enrich_top = 10
//!
//! [analytics]
//! damping = 0.85
//! iterations = 50
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analytics::AnalyticsConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::infer::InferenceConfig;
use crate::resolve::DEFAULT_FUZZY_THRESHOLD;
use crate::store::StoreConfig;
use crate::tension::TensionConfig;

/// Entity resolver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Minimum fuzzy score (0–100) for a fuzzy match (default: 80).
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: u8,
}

fn default_fuzzy_threshold() -> u8 {
    DEFAULT_FUZZY_THRESHOLD
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonConfig {
    /// Data directory for persistence. `None` for memory-only mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub tension: TensionConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

impl CanonConfig {
    /// Load from a TOML file and validate.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise return the defaults.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Reject values no component can work with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.resolver.fuzzy_threshold > 100 {
            return Err(ConfigError::Invalid {
                message: format!(
                    "resolver.fuzzy_threshold must be between 0 and 100, got {}",
                    self.resolver.fuzzy_threshold
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.analytics.damping) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "analytics.damping must be between 0 and 1, got {}",
                    self.analytics.damping
                ),
            });
        }
        for (name, decay) in [
            ("inference.transitive_decay", self.inference.transitive_decay),
            ("inference.inheritance_decay", self.inference.inheritance_decay),
        ] {
            if !(0.0..=1.0).contains(&decay) {
                return Err(ConfigError::Invalid {
                    message: format!("{name} must be between 0 and 1, got {decay}"),
                });
            }
        }
        Ok(())
    }

    /// Store settings derived from this config.
    pub fn to_store_config(&self) -> StoreConfig {
        StoreConfig {
            data_dir: self.data_dir.clone(),
            fuzzy_threshold: self.resolver.fuzzy_threshold,
        }
    }
}
