//! Environment source: ENRICHER__SECTION__KEY variables.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

/// Add the environment layer; it overrides every file layer.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("ENRICHER")
            .separator("__")
            .try_parsing(true),
    )
}
