//! CLI route: single route table and run context. Dispatches to the orchestrator,
//! the catalog store and output formatters.

use crate::catalog::{CatalogItem, PromptTemplate, SledCatalogStore, SledStoreOpener};
use crate::clock::SystemClock;
use crate::config::{ConfigLoader, EnricherConfig};
use crate::error::{EnrichError, StorageError};
use crate::orchestrator::{Orchestrator, RunMode, RunSettings, Selection};
use crate::provider::OpenAIClient;
use crate::types::CatalogId;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::cli::command_name;
use crate::cli::output::{
    format_catalog_table, format_import_summary, format_run_summary,
};
use crate::cli::parse::{CatalogCommands, Commands, ConfigCommands, ModeArg};

/// Runtime context for CLI execution: workspace and the loaded configuration.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    workspace_root: PathBuf,
    config: EnricherConfig,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, EnrichError> {
        let mut config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };

        // Relative artifact directories live under the workspace.
        if config.batch.artifact_dir.is_relative() {
            config.batch.artifact_dir = workspace_root.join(&config.batch.artifact_dir);
        }

        Ok(Self {
            workspace_root,
            config,
        })
    }

    /// Loaded configuration.
    pub fn config(&self) -> &EnricherConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, EnrichError> {
        let started = Instant::now();
        let name = command_name(command);
        debug!(command = %name, workspace = %self.workspace_root.display(), "Executing command");
        let result = self.execute_inner(command);
        info!(
            command = %name,
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, EnrichError> {
        match command {
            Commands::Run { mode, limit, item } => {
                let selection = match (item, limit) {
                    (Some(id), _) => Selection::Item(CatalogId(*id)),
                    (None, Some(limit)) => Selection::Limit(*limit),
                    (None, None) => Selection::Default,
                };
                let mode = match mode {
                    ModeArg::Sync => RunMode::Sync,
                    ModeArg::Batch => RunMode::Batch,
                };
                let orchestrator = self.orchestrator()?;
                let summary = block_on(orchestrator.run(mode, selection))??;
                Ok(format_run_summary(&summary))
            }
            Commands::Resume { batch_id } => {
                let orchestrator = self.orchestrator()?;
                let summary = block_on(orchestrator.resume(batch_id))??;
                Ok(format_run_summary(&summary))
            }
            Commands::Catalog { command } => self.handle_catalog(command),
            Commands::Config { command } => match command {
                ConfigCommands::Show => self.config.to_redacted_toml(),
            },
        }
    }

    fn handle_catalog(&self, command: &CatalogCommands) -> Result<String, EnrichError> {
        let store = self.open_store()?;
        match command {
            CatalogCommands::Import { path } => {
                let items = read_items(path)?;
                store.put_items(&items)?;
                info!(count = items.len(), path = %path.display(), "Imported catalog items");
                Ok(format_import_summary(items.len(), path))
            }
            CatalogCommands::SetPrompt { key, path } => {
                let key = key.unwrap_or(self.config.catalog.prompt_key);
                let text = std::fs::read_to_string(path).map_err(StorageError::IoError)?;
                let template = PromptTemplate::new(key, text);
                if template.is_blank() {
                    return Err(EnrichError::Configuration(format!(
                        "Prompt file {} is empty",
                        path.display()
                    )));
                }
                store.put_prompt(&template)?;
                Ok(format!("Stored prompt template {} from {}", key, path.display()))
            }
            CatalogCommands::List { pending, format } => {
                let mut items = store.list_all()?;
                if *pending {
                    items.retain(CatalogItem::is_pending);
                }
                format_catalog_table(&items, format)
            }
        }
    }

    fn open_store(&self) -> Result<SledCatalogStore, EnrichError> {
        let path = self.config.catalog.resolved_store_path();
        std::fs::create_dir_all(&path).map_err(StorageError::IoError)?;
        debug!(path = %path.display(), "Opening catalog store");
        Ok(SledCatalogStore::new(&path)?)
    }

    fn orchestrator(&self) -> Result<Orchestrator, EnrichError> {
        self.config.validate_for_remote()?;
        let client = Arc::new(OpenAIClient::from_settings(&self.config.provider)?);
        let stores = SledStoreOpener::new(self.config.catalog.resolved_store_path());
        Ok(Orchestrator::new(
            Arc::new(stores),
            client.clone(),
            client,
            Arc::new(SystemClock),
            RunSettings::from_config(&self.config),
        ))
    }
}

fn read_items(path: &Path) -> Result<Vec<CatalogItem>, EnrichError> {
    let raw = std::fs::read_to_string(path).map_err(StorageError::IoError)?;
    serde_json::from_str(&raw).map_err(|e| {
        EnrichError::Configuration(format!(
            "{} is not a JSON array of catalog items: {}",
            path.display(),
            e
        ))
    })
}

fn block_on<F: std::future::Future>(future: F) -> Result<F::Output, EnrichError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| EnrichError::Configuration(format!("Failed to start async runtime: {}", e)))?;
    Ok(runtime.block_on(future))
}
