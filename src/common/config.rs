//! Configuration file handling

use serde::Deserialize;
use std::path::Path;

use super::paths::config_path;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Target deployment settings
    #[serde(default)]
    pub target: TargetConfig,

    /// Default run settings
    #[serde(default)]
    pub run: RunDefaults,
}

/// Target deployment the suite is run against
#[derive(Debug, Deserialize, Default, Clone)]
pub struct TargetConfig {
    /// Service root, e.g. `https://rag.example.com`
    pub base_url: Option<String>,

    /// Key accepted by the key-provisioning endpoint
    pub admin_key: Option<String>,
}

/// Defaults for `run` flags
#[derive(Debug, Deserialize, Default, Clone)]
pub struct RunDefaults {
    /// Require a `doc_id` in ingest acknowledgments
    #[serde(default)]
    pub strict_ingest: bool,

    /// Probe `/health` and `/bedrock/status` before the suite
    #[serde(default)]
    pub preflight: bool,
}

/// Everything the runner needs, threaded through every step by value
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub base_url: String,
    pub admin_key: String,
    pub strict_ingest: bool,
    pub preflight: bool,
    /// Suppress the human-readable step lines
    pub quiet: bool,
}

impl RunConfig {
    /// Minimal config with both optional checks off
    pub fn new(base_url: impl Into<String>, admin_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            admin_key: admin_key.into(),
            strict_ingest: false,
            preflight: false,
            quiet: false,
        }
    }
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Resolve the base URL: explicit value (flag or env) wins over the file
    pub fn base_url(&self, explicit: Option<String>) -> Result<String> {
        explicit
            .or_else(|| self.target.base_url.clone())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "No base URL. Pass --base-url, set RAG_BASE_URL, or add target.base_url to the config file"
                        .to_string(),
                )
            })
    }

    /// Resolve the admin key: explicit value (flag or env) wins over the file
    pub fn admin_key(&self, explicit: Option<String>) -> Result<String> {
        explicit
            .or_else(|| self.target.admin_key.clone())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "No admin key. Pass --admin-key, set RAG_ADMIN_KEY, or add target.admin_key to the config file"
                        .to_string(),
                )
            })
    }
}
