//! Merge rules: built-in defaults applied beneath every file and env layer.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("provider.base_url", "https://api.openai.com/v1")?
        .set_default("provider.model", "gpt-5.1")?
        .set_default("batch.artifact_dir", "batch_files")?
        .set_default("batch.poll_interval_secs", 300)?
        .set_default("batch.max_wait_units", 288)?
        .set_default("catalog.prompt_key", 1)?
        .set_default("catalog.default_limit", 3)?
        .set_default("catalog.placeholder", "{name}")
}
