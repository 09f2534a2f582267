//! Catalog Store
//!
//! Catalog items eligible for content enrichment, the prompt templates used to
//! generate that content, and the read/write contract the pipeline consumes.
//! Items only move forward: `Unprocessed` to `Processed`, never back.

pub mod persistence;

pub use persistence::{SledCatalogStore, SledStoreOpener};

use crate::error::StorageError;
use crate::types::CatalogId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Enrichment state of a catalog item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    #[default]
    Unprocessed,
    Processed,
}

/// Descriptive fields written by the reconciliation engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemContent {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub seo: String,
}

/// A product-like record eligible for content enrichment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: CatalogId,
    pub name: String,
    /// European article number; empty when unknown
    #[serde(default)]
    pub ean: String,
    /// Universal product code; empty when unknown
    #[serde(default)]
    pub upc: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub quantity: i64,
    /// Recency key used to order the pending queue
    pub listed_at: DateTime<Utc>,
    #[serde(default)]
    pub state: ProcessingState,
    #[serde(default)]
    pub last_attempt_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub content: ItemContent,
    /// Item has an active marketplace listing that mirrors its description
    #[serde(default)]
    pub marketplace_active: bool,
    /// Listing must be revised by the downstream marketplace sync
    #[serde(default)]
    pub marketplace_revise: bool,
}

fn default_active() -> bool {
    true
}

impl CatalogItem {
    /// External manufacturer identifiers that are present, EAN first.
    pub fn manufacturer_ids(&self) -> impl Iterator<Item = &str> {
        [self.ean.as_str(), self.upc.as_str()]
            .into_iter()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Whether the item belongs in the pending enrichment queue.
    pub fn is_pending(&self) -> bool {
        self.state == ProcessingState::Unprocessed
            && self.active
            && self.price > 0.0
            && self.quantity > 0
            && !self.sku.trim().is_empty()
            && self.manufacturer_ids().next().is_some()
    }
}

/// Parameterized instruction text sent to the generative service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub key: u32,
    pub text: String,
}

impl PromptTemplate {
    pub fn new(key: u32, text: impl Into<String>) -> Self {
        Self {
            key,
            text: text.into(),
        }
    }

    pub fn contains_placeholder(&self, placeholder: &str) -> bool {
        !placeholder.is_empty() && self.text.contains(placeholder)
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Content written back on a successful enrichment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentUpdate {
    /// Full description: prior content plus the generated block
    pub description: String,
    pub title: String,
    pub short_description: String,
    pub seo: String,
}

/// Catalog store contract consumed by the pipeline
pub trait CatalogStore: Send + Sync {
    /// Up to `limit` pending items, oldest `listed_at` first.
    fn fetch_pending(&self, limit: usize) -> Result<Vec<CatalogItem>, StorageError>;

    /// One item by id, regardless of its state.
    fn fetch_item(&self, id: CatalogId) -> Result<Option<CatalogItem>, StorageError>;

    /// Prompt template text for a template-type key.
    fn fetch_prompt(&self, key: u32) -> Result<Option<PromptTemplate>, StorageError>;

    /// Write generated content, mark the item processed and stamp the attempt.
    fn write_enrichment(
        &self,
        id: CatalogId,
        update: &EnrichmentUpdate,
        attempted_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Stamp the attempt time only; the processing state is left untouched.
    fn stamp_attempt(&self, id: CatalogId, attempted_at: DateTime<Utc>)
        -> Result<(), StorageError>;
}

/// Opens the catalog store for one unit of work.
///
/// Callers drop the returned handle before any remote call or poll interval,
/// so the store is never held open while waiting on the network.
pub trait StoreOpener: Send + Sync {
    fn open(&self) -> Result<Arc<dyn CatalogStore>, StorageError>;
}
