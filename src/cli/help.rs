//! CLI help: stable command names for logging.

use crate::cli::parse::{CatalogCommands, Commands, ConfigCommands};

pub fn command_name(command: &Commands) -> String {
    match command {
        Commands::Run { .. } => "run".to_string(),
        Commands::Resume { .. } => "resume".to_string(),
        Commands::Catalog { command } => format!("catalog.{}", catalog_command_name(command)),
        Commands::Config { command } => format!("config.{}", config_command_name(command)),
    }
}

pub fn catalog_command_name(command: &CatalogCommands) -> &'static str {
    match command {
        CatalogCommands::Import { .. } => "import",
        CatalogCommands::SetPrompt { .. } => "set_prompt",
        CatalogCommands::List { .. } => "list",
    }
}

pub fn config_command_name(command: &ConfigCommands) -> &'static str {
    match command {
        ConfigCommands::Show => "show",
    }
}
