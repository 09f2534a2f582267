//! Catalog Enricher: generated marketing content for product catalogs
//!
//! Selects catalog items that still lack generated content, renders a prompt
//! per item, and obtains structured content from an OpenAI-compatible service,
//! either one request at a time or as a single bulk job that is polled to
//! completion. Results are decoded line by line and written back to the
//! catalog store.

pub mod batch;
pub mod catalog;
pub mod cli;
pub mod clock;
pub mod config;
pub mod content;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod provider;
pub mod reconcile;
pub mod types;

pub use batch::{BatchSubmitter, RequestBuilder, ResultDecoder, StatusPoller};
pub use catalog::{CatalogItem, CatalogStore, SledCatalogStore, SledStoreOpener, StoreOpener};
pub use error::{DecodeError, EnrichError, StorageError, TransportError};
pub use orchestrator::{Orchestrator, RunMode, RunSettings, RunSummary, Selection};
pub use reconcile::ReconciliationEngine;
