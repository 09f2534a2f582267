//! Reconciliation Engine
//!
//! Applies decoded results to the catalog store. A usable success payload is
//! rendered into the item description and the item is marked processed; every
//! other outcome only stamps the attempt time so the item stays eligible for a
//! later run.
//!
//! Each record is applied on its own. A store failure for one item is logged
//! and reported in its acknowledgement; it never stops the remaining records.

pub mod render;

use crate::batch::{Outcome, ResultRecord};
use crate::catalog::{CatalogStore, EnrichmentUpdate};
use crate::clock::Clock;
use crate::content::GeneratedContent;
use crate::error::{EnrichError, StorageError};
use crate::types::CatalogId;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of applying one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyAck {
    /// Content written and item marked processed. `appended` is false when the
    /// description already held the identical generated block.
    Processed { id: CatalogId, appended: bool },
    /// Only the attempt time was stamped
    AttemptStamped { id: CatalogId, reason: String },
    /// No such item in the catalog; nothing written
    ItemMissing { id: CatalogId },
    /// The store rejected the write; the item is left as it was
    WriteFailed { id: CatalogId, reason: String },
}

/// Counts over a set of acknowledgements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub processed: usize,
    pub stamped: usize,
    pub failed: usize,
}

impl ReconcileSummary {
    pub fn record(&mut self, ack: &ApplyAck) {
        match ack {
            ApplyAck::Processed { .. } => self.processed += 1,
            ApplyAck::AttemptStamped { .. } => self.stamped += 1,
            ApplyAck::ItemMissing { .. } | ApplyAck::WriteFailed { .. } => self.failed += 1,
        }
    }
}

/// Writes decoded outcomes back to the catalog store
pub struct ReconciliationEngine {
    store: Arc<dyn CatalogStore>,
    clock: Arc<dyn Clock>,
}

impl ReconciliationEngine {
    pub fn new(store: Arc<dyn CatalogStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Apply one record.
    pub fn apply(&self, record: &ResultRecord) -> ApplyAck {
        let id = record.catalog_id;
        let outcome = match &record.outcome {
            Outcome::Success(content) if !content.is_empty() => self.apply_success(id, content),
            Outcome::Success(_) => self.apply_attempt(id, "empty generated content".to_string()),
            Outcome::Failure(reason) => {
                warn!(item_id = %id, custom_id = %record.correlation_id, reason = %reason, "Request failed remotely");
                self.apply_attempt(id, reason.clone())
            }
            Outcome::Malformed(reason) => {
                warn!(item_id = %id, custom_id = %record.correlation_id, reason = %reason, "Unusable result payload");
                self.apply_attempt(id, reason.clone())
            }
        };

        match outcome {
            Ok(ack) => ack,
            Err(EnrichError::Reconciliation {
                source: StorageError::ItemNotFound(_),
                ..
            }) => {
                error!(item_id = %id, "Result refers to an unknown catalog item");
                ApplyAck::ItemMissing { id }
            }
            Err(e) => {
                error!(item_id = %id, error = %e, "Failed to write result to catalog");
                ApplyAck::WriteFailed {
                    id,
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Apply records in order; one failure never prevents the rest.
    pub fn apply_all<'a, I>(&self, records: I) -> (Vec<ApplyAck>, ReconcileSummary)
    where
        I: IntoIterator<Item = &'a ResultRecord>,
    {
        let mut summary = ReconcileSummary::default();
        let acks: Vec<ApplyAck> = records
            .into_iter()
            .map(|record| {
                let ack = self.apply(record);
                summary.record(&ack);
                ack
            })
            .collect();
        info!(
            processed = summary.processed,
            stamped = summary.stamped,
            failed = summary.failed,
            "Reconciled results"
        );
        (acks, summary)
    }

    fn apply_success(
        &self,
        id: CatalogId,
        content: &GeneratedContent,
    ) -> Result<ApplyAck, EnrichError> {
        let item = self
            .store
            .fetch_item(id)
            .map_err(|source| EnrichError::Reconciliation { id, source })?
            .ok_or(EnrichError::Reconciliation {
                id,
                source: StorageError::ItemNotFound(id),
            })?;

        let block = render::generated_block(content);
        let previous = item.content.description;
        // Re-applying the same result must not append the block twice.
        let appended = !previous.contains(&block);
        let description = if appended {
            render::combined_description(&previous, &block)
        } else {
            debug!(item_id = %id, "Generated block already present; description unchanged");
            previous
        };

        let update = EnrichmentUpdate {
            description,
            title: content.title.clone(),
            short_description: content.short_description.clone(),
            seo: content.seo.clone(),
        };
        self.store
            .write_enrichment(id, &update, self.clock.now())
            .map_err(|source| EnrichError::Reconciliation { id, source })?;

        info!(item_id = %id, appended, "Item enriched");
        Ok(ApplyAck::Processed { id, appended })
    }

    fn apply_attempt(&self, id: CatalogId, reason: String) -> Result<ApplyAck, EnrichError> {
        self.store
            .stamp_attempt(id, self.clock.now())
            .map_err(|source| EnrichError::Reconciliation { id, source })?;
        debug!(item_id = %id, "Attempt stamped");
        Ok(ApplyAck::AttemptStamped { id, reason })
    }
}
