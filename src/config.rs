//! Configuration System
//!
//! Layered configuration for the enrichment pipeline: built-in defaults, the
//! global file, workspace files, then `ENRICHER__*` environment variables.
//! Credentials are resolved once here and handed to each component at
//! construction; nothing downstream reads the process environment.

use crate::error::EnrichError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod merge {
    pub mod merge_policy;
}
mod sources {
    pub mod environment;
    pub mod global_file;
    pub mod workspace_file;
}

pub use sources::global_file::global_config_path;

/// Fallback environment variable for the provider API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnricherConfig {
    #[serde(default)]
    pub provider: ProviderSettings,

    #[serde(default)]
    pub batch: BatchSettings,

    #[serde(default)]
    pub catalog: CatalogSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Generative service connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature for the synchronous path
    #[serde(default)]
    pub temperature: f32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-5.1".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            temperature: 0.0,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Bulk submission and polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSettings {
    /// Directory receiving the bulk request artifacts
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Upper bound on status queries for one job
    #[serde(default = "default_max_wait_units")]
    pub max_wait_units: u32,

    /// Pause after a failed synchronous request
    #[serde(default = "default_sync_failure_backoff_ms")]
    pub sync_failure_backoff_ms: u64,
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("batch_files")
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_max_wait_units() -> u32 {
    288
}

fn default_sync_failure_backoff_ms() -> u64 {
    1000
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            poll_interval_secs: default_poll_interval_secs(),
            max_wait_units: default_max_wait_units(),
            sync_failure_backoff_ms: default_sync_failure_backoff_ms(),
        }
    }
}

impl BatchSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn sync_failure_backoff(&self) -> Duration {
        Duration::from_millis(self.sync_failure_backoff_ms)
    }
}

/// Catalog store and prompt selection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// Store directory; defaults to the platform data directory
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// Template-type key of the prompt to use
    #[serde(default = "default_prompt_key")]
    pub prompt_key: u32,

    /// Item count when neither a limit nor an item id is given
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Substitution token for the item name in the prompt template
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

fn default_prompt_key() -> u32 {
    1
}

fn default_limit() -> usize {
    3
}

fn default_placeholder() -> String {
    "{name}".to_string()
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            store_path: None,
            prompt_key: default_prompt_key(),
            default_limit: default_limit(),
            placeholder: default_placeholder(),
        }
    }
}

impl CatalogSettings {
    /// Effective store directory
    pub fn resolved_store_path(&self) -> PathBuf {
        if let Some(path) = &self.store_path {
            return path.clone();
        }
        directories::ProjectDirs::from("", "", "enricher")
            .map(|dirs| dirs.data_dir().join("catalog"))
            .unwrap_or_else(|| PathBuf::from(".enricher/catalog"))
    }
}

impl EnricherConfig {
    /// API key, if one was configured
    pub fn api_key(&self) -> Option<&str> {
        self.provider
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Validate settings required before any remote call
    pub fn validate_for_remote(&self) -> Result<(), EnrichError> {
        let mut problems = Vec::new();
        if self.api_key().is_none() {
            problems.push(format!(
                "provider.api_key is not set (config file, ENRICHER__PROVIDER__API_KEY or {})",
                API_KEY_ENV
            ));
        }
        if self.provider.model.trim().is_empty() {
            problems.push("provider.model cannot be empty".to_string());
        }
        if !self.provider.base_url.starts_with("http://")
            && !self.provider.base_url.starts_with("https://")
        {
            problems.push(format!(
                "provider.base_url '{}' is not an http(s) URL",
                self.provider.base_url
            ));
        }
        if self.catalog.placeholder.trim().is_empty() {
            problems.push("catalog.placeholder cannot be empty".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(EnrichError::Configuration(problems.join("; ")))
        }
    }

    /// Render the effective configuration as TOML with the API key masked
    pub fn to_redacted_toml(&self) -> Result<String, EnrichError> {
        let mut shown = self.clone();
        if shown.provider.api_key.is_some() {
            shown.provider.api_key = Some("********".to_string());
        }
        toml::to_string_pretty(&shown)
            .map_err(|e| EnrichError::Configuration(format!("Failed to render config: {}", e)))
    }

    fn apply_env_fallbacks(mut self) -> Self {
        if self.api_key().is_none() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                self.provider.api_key = Some(key);
            }
        }
        self
    }
}

/// Loads [`EnricherConfig`] from its layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace
    ///
    /// Precedence (lowest to highest): defaults, global file, workspace files,
    /// `ENRICHER__*` environment variables.
    pub fn load(workspace_root: &Path) -> Result<EnricherConfig, EnrichError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = sources::environment::add_to_builder(builder);

        let config: EnricherConfig = builder.build()?.try_deserialize()?;
        Ok(config.apply_env_fallbacks())
    }

    /// Load configuration from one explicit file (plus the environment layer)
    pub fn load_from_file(path: &Path) -> Result<EnricherConfig, EnrichError> {
        if !path.exists() {
            return Err(EnrichError::Configuration(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let builder = merge::merge_policy::builder_with_defaults()?
            .add_source(config::File::from(path).required(true));
        let builder = sources::environment::add_to_builder(builder);

        let config: EnricherConfig = builder.build()?.try_deserialize()?;
        Ok(config.apply_env_fallbacks())
    }
}
