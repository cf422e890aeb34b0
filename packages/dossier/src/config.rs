//! Dossier configuration file.
//!
//! Every key has a default, so an empty file (or no file at all) is a
//! valid configuration:
//!
//! ```toml
//! [geometry]
//! area_crs = "EPSG:3083"
//!
//! [geometry.service_areas]
//! path = "data/service_areas.geojson"
//!
//! [census]
//! year = 2021
//! state_fips = "48"
//!
//! [network]
//! timeout_secs = 60
//! retries = 3
//!
//! [context]
//! max_age_secs = 86400
//! ```
//!
//! `CENSUS_API_KEY` in the environment overrides `census.api_key`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pws_dossier_demographics::AcsQuery;
use pws_dossier_geometry::GeometryConfig;
use serde::{Deserialize, Serialize};

/// Config file read when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "pws_dossier.toml";

/// Environment variable that overrides the census API key.
pub const CENSUS_API_KEY_ENV: &str = "CENSUS_API_KEY";

/// Errors that can occur while loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has the wrong shape.
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Registry search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub base_url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: pws_dossier_extract::registry::DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Drinking Water Watch host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    pub base_url: String,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            base_url: pws_dossier_extract::locate::DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Timeout and retry applied around every network call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Per-attempt timeout.
    pub timeout_secs: u64,
    /// Retries after the first attempt.
    pub retries: u32,
    /// First backoff delay; doubles on every retry.
    pub backoff_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            retries: 3,
            backoff_ms: 2_000,
        }
    }
}

/// Dataset refresh policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Age after which a loaded dataset context counts as stale.
    pub max_age_secs: u64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_age_secs: 24 * 60 * 60,
        }
    }
}

impl ContextConfig {
    #[must_use]
    pub const fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DossierConfig {
    pub geometry: GeometryConfig,
    pub census: AcsQuery,
    pub registry: RegistryConfig,
    pub documents: DocumentsConfig,
    pub network: NetworkConfig,
    pub context: ContextConfig,
}

impl DossierConfig {
    /// Loads the config from `path`, or from [`DEFAULT_CONFIG_PATH`] when
    /// `path` is `None`, then applies environment overrides.
    ///
    /// A missing default file means all defaults; a missing explicit file
    /// is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::read(path)?
                } else {
                    log::info!("No {DEFAULT_CONFIG_PATH} found, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        log::debug!("Reading config from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parses config text without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not a valid config.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Applies environment overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(CENSUS_API_KEY_ENV).filter(|key| !key.trim().is_empty()) {
            log::debug!("Using census API key from {CENSUS_API_KEY_ENV}");
            self.census.api_key = Some(key);
        }
    }
}
