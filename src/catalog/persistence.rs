//! Persistence layer for the catalog store

use crate::catalog::{
    CatalogItem, CatalogStore, EnrichmentUpdate, ProcessingState, PromptTemplate, StoreOpener,
};
use crate::error::StorageError;
use crate::types::CatalogId;
use chrono::{DateTime, Utc};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const ITEMS_TREE: &str = "items";
const PROMPTS_TREE: &str = "prompts";

/// Reason a single-item transaction was aborted
#[derive(Debug)]
enum TxAbort {
    Missing,
    Codec(String),
}

/// Sled-based implementation of CatalogStore
///
/// Items are stored as one bincode record per id (big-endian key, so the tree
/// iterates in id order). Each update is a single transaction on that record,
/// so a write either lands completely or not at all.
pub struct SledCatalogStore {
    db: sled::Db,
    items: sled::Tree,
    prompts: sled::Tree,
}

fn item_key(id: CatalogId) -> [u8; 8] {
    id.0.to_be_bytes()
}

fn prompt_key(key: u32) -> [u8; 4] {
    key.to_be_bytes()
}

fn unavailable(context: &str, e: impl std::fmt::Display) -> StorageError {
    StorageError::Unavailable(format!("{}: {}", context, e))
}

impl SledCatalogStore {
    /// Open (or create) a catalog store at the given directory
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(|e| unavailable("Failed to open sled database", e))?;
        Self::from_db(db)
    }

    /// Open a throwaway store that is removed when dropped
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| unavailable("Failed to open temporary database", e))?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, StorageError> {
        let items = db
            .open_tree(ITEMS_TREE)
            .map_err(|e| unavailable("Failed to open items tree", e))?;
        let prompts = db
            .open_tree(PROMPTS_TREE)
            .map_err(|e| unavailable("Failed to open prompts tree", e))?;
        Ok(Self { db, items, prompts })
    }

    /// Insert or replace a catalog item
    pub fn put_item(&self, item: &CatalogItem) -> Result<(), StorageError> {
        let value =
            bincode::serialize(item).map_err(|e| StorageError::Codec(e.to_string()))?;
        self.items
            .insert(item_key(item.id).to_vec(), value)
            .map_err(|e| unavailable("Failed to put catalog item", e))?;
        Ok(())
    }

    /// Batch insert multiple items
    pub fn put_items(&self, items: &[CatalogItem]) -> Result<(), StorageError> {
        let mut batch = sled::Batch::default();
        for item in items {
            let value =
                bincode::serialize(item).map_err(|e| StorageError::Codec(e.to_string()))?;
            batch.insert(item_key(item.id).to_vec(), value);
        }
        self.items
            .apply_batch(batch)
            .map_err(|e| unavailable("Failed to apply item batch", e))?;
        self.flush()
    }

    /// Insert or replace a prompt template
    pub fn put_prompt(&self, prompt: &PromptTemplate) -> Result<(), StorageError> {
        self.prompts
            .insert(prompt_key(prompt.key).to_vec(), prompt.text.as_bytes())
            .map_err(|e| unavailable("Failed to put prompt", e))?;
        self.flush()
    }

    /// Every stored item in id order
    pub fn list_all(&self) -> Result<Vec<CatalogItem>, StorageError> {
        let mut records = Vec::new();
        for entry in self.items.iter() {
            let (_, value) = entry.map_err(|e| unavailable("Failed to iterate items", e))?;
            records.push(decode_item(&value)?);
        }
        Ok(records)
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db
            .flush()
            .map_err(|e| unavailable("Failed to flush database", e))?;
        Ok(())
    }

    /// Apply `change` to one stored item inside a transaction.
    fn modify_item<F>(&self, id: CatalogId, change: F) -> Result<(), StorageError>
    where
        F: Fn(&mut CatalogItem),
    {
        let key = item_key(id);
        let outcome = self.items.transaction(|tx| {
            let raw = match tx.get(key)? {
                Some(raw) => raw,
                None => return Err(ConflictableTransactionError::Abort(TxAbort::Missing)),
            };
            let mut item: CatalogItem = bincode::deserialize(&raw).map_err(|e| {
                ConflictableTransactionError::Abort(TxAbort::Codec(e.to_string()))
            })?;
            change(&mut item);
            let encoded = bincode::serialize(&item).map_err(|e| {
                ConflictableTransactionError::Abort(TxAbort::Codec(e.to_string()))
            })?;
            tx.insert(key.to_vec(), encoded)?;
            Ok(())
        });

        match outcome {
            Ok(()) => self.flush(),
            Err(TransactionError::Abort(TxAbort::Missing)) => Err(StorageError::ItemNotFound(id)),
            Err(TransactionError::Abort(TxAbort::Codec(msg))) => Err(StorageError::Codec(msg)),
            Err(TransactionError::Storage(e)) => Err(unavailable("Item transaction failed", e)),
        }
    }
}

fn decode_item(raw: &[u8]) -> Result<CatalogItem, StorageError> {
    bincode::deserialize(raw)
        .map_err(|e| StorageError::Codec(format!("Failed to deserialize catalog item: {}", e)))
}

impl CatalogStore for SledCatalogStore {
    fn fetch_pending(&self, limit: usize) -> Result<Vec<CatalogItem>, StorageError> {
        let mut pending: Vec<CatalogItem> = self
            .list_all()?
            .into_iter()
            .filter(CatalogItem::is_pending)
            .collect();
        pending.sort_by(|a, b| a.listed_at.cmp(&b.listed_at).then(a.id.cmp(&b.id)));
        pending.truncate(limit);
        Ok(pending)
    }

    fn fetch_item(&self, id: CatalogId) -> Result<Option<CatalogItem>, StorageError> {
        match self
            .items
            .get(item_key(id))
            .map_err(|e| unavailable("Failed to get catalog item", e))?
        {
            Some(value) => Ok(Some(decode_item(&value)?)),
            None => Ok(None),
        }
    }

    fn fetch_prompt(&self, key: u32) -> Result<Option<PromptTemplate>, StorageError> {
        match self
            .prompts
            .get(prompt_key(key))
            .map_err(|e| unavailable("Failed to get prompt", e))?
        {
            Some(value) => Ok(Some(PromptTemplate {
                key,
                text: String::from_utf8_lossy(&value).into_owned(),
            })),
            None => Ok(None),
        }
    }

    fn write_enrichment(
        &self,
        id: CatalogId,
        update: &EnrichmentUpdate,
        attempted_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.modify_item(id, |item| {
            item.content.description = update.description.clone();
            item.content.title = update.title.clone();
            item.content.short_description = update.short_description.clone();
            item.content.seo = update.seo.clone();
            item.state = ProcessingState::Processed;
            item.last_attempt_at = Some(attempted_at);
            if item.marketplace_active {
                item.marketplace_revise = true;
            }
        })
    }

    fn stamp_attempt(
        &self,
        id: CatalogId,
        attempted_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.modify_item(id, |item| {
            item.last_attempt_at = Some(attempted_at);
        })
    }
}

/// Opens a [`SledCatalogStore`] at a fixed directory on every call.
///
/// sled locks its directory for as long as the `Db` lives; dropping the
/// returned handle releases the lock for other invocations.
#[derive(Debug, Clone)]
pub struct SledStoreOpener {
    path: PathBuf,
}

impl SledStoreOpener {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StoreOpener for SledStoreOpener {
    fn open(&self) -> Result<Arc<dyn CatalogStore>, StorageError> {
        std::fs::create_dir_all(&self.path)?;
        debug!(path = %self.path.display(), "Opening catalog store");
        Ok(Arc::new(SledCatalogStore::new(&self.path)?))
    }
}
