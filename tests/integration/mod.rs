//! Integration tests for the catalog enrichment pipeline

mod batch_pipeline;
mod catalog_cli;
mod sync_pipeline;
mod test_utils;
