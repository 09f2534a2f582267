//! CLI parse: clap types for the enricher. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Enricher CLI - generated catalog content through bulk or direct requests
#[derive(Parser)]
#[command(name = "enricher")]
#[command(about = "Enrich catalog items with generated descriptions")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (holds config/ and batch artifacts)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Processing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// One direct request per item
    Sync,
    /// One bulk job for all selected items
    Batch,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enrich pending catalog items
    Run {
        /// Processing mode
        #[arg(long, value_enum, default_value = "batch")]
        mode: ModeArg,
        /// Maximum number of pending items (default from config)
        #[arg(long, conflicts_with = "item")]
        limit: Option<usize>,
        /// Enrich exactly this item id, whatever its state
        #[arg(long)]
        item: Option<u64>,
    },
    /// Resume monitoring an existing batch job and apply its results
    Resume {
        /// Remote batch job id
        #[arg(long)]
        batch_id: String,
    },
    /// Catalog administration
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
    /// Configuration inspection
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum CatalogCommands {
    /// Import items from a JSON array file (existing ids are replaced)
    Import {
        /// Path to the JSON file
        path: PathBuf,
    },
    /// Store a prompt template from a text file
    SetPrompt {
        /// Template-type key (default from config)
        #[arg(long)]
        key: Option<u32>,
        /// Path to the template text
        path: PathBuf,
    },
    /// List catalog items
    List {
        /// Only items still pending enrichment
        #[arg(long)]
        pending: bool,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration (API key masked)
    Show,
}
