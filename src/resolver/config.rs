//! Resolver configuration.

use serde::Deserialize;
use std::path::Path;

use crate::classifier::DEFAULT_LOOPBACK_SUBSTITUTE;
use crate::error::Result;

/// Latest client release advertised in every bundle.
pub const DEFAULT_LATEST_VERSION: &str = "0.6.1.0";

/// Base URL that release installers are published under.
pub const DEFAULT_FILE_BASE: &str = "http://steam-limiter.googlecode.com/files/";

/// Country reported when the caller has no hint.
pub const DEFAULT_COUNTRY: &str = "Unknown";

/// Constants the resolver copies into bundles, plus classifier tuning.
///
/// Every field is optional in YAML; missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Latest client version string
    pub latest_version: String,
    /// Download URL for the latest installer
    pub download_url: String,
    /// Address classified in place of `127.0.0.1`
    pub loopback_substitute: String,
    /// Country used when no hint is supplied
    pub default_country: String,
}

impl EngineConfig {
    /// Create a config for a release; other fields keep their defaults.
    pub fn new(latest_version: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            latest_version: latest_version.into(),
            download_url: download_url.into(),
            ..Self::default()
        }
    }

    /// Create a config for a release published under [`DEFAULT_FILE_BASE`].
    pub fn for_release(version: &str) -> Self {
        Self::new(version, installer_url(DEFAULT_FILE_BASE, version))
    }

    /// Parse a config from YAML.
    pub fn from_yaml(text: &str) -> Result<Self> {
        // An empty document deserializes as unit, not an empty map
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load a config from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Set the loopback substitute address.
    pub fn with_loopback_substitute(mut self, address: impl Into<String>) -> Self {
        self.loopback_substitute = address.into();
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            latest_version: DEFAULT_LATEST_VERSION.to_string(),
            download_url: installer_url(DEFAULT_FILE_BASE, DEFAULT_LATEST_VERSION),
            loopback_substitute: DEFAULT_LOOPBACK_SUBSTITUTE.to_string(),
            default_country: DEFAULT_COUNTRY.to_string(),
        }
    }
}

/// Installer URL for a version: `<base>steamlimit-<version>.exe`.
pub fn installer_url(base: &str, version: &str) -> String {
    format!("{}steamlimit-{}.exe", base, version)
}
