//! CLI domain: parse, route, help and output only.
//! No pipeline logic; the route table dispatches to the orchestrator and the catalog store.

mod help;
mod output;
mod parse;
mod route;

pub use help::command_name;
pub use output::{format_catalog_table, format_import_summary, format_run_summary, map_error};
pub use parse::{CatalogCommands, Cli, Commands, ConfigCommands, ModeArg};
pub use route::RunContext;
