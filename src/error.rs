//! Error types for the catalog enrichment pipeline.

use crate::types::CatalogId;
use thiserror::Error;

/// Catalog store errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Catalog item not found: {0}")]
    ItemNotFound(CatalogId),

    #[error("Catalog store unavailable: {0}")]
    Unavailable(String),

    #[error("Catalog record codec error: {0}")]
    Codec(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors talking to the generative service
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Remote returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Failed to decode remote response: {0}")]
    Decode(String),

    #[error("Artifact I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run-level errors; these abort the current invocation
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Batch job {job_id} ended with status '{status}'")]
    TerminalJobFailure { job_id: String, status: String },

    #[error("Batch job {job_id}: status query failed: {reason}")]
    StatusQueryFailed { job_id: String, reason: String },

    #[error("Batch job {job_id} did not finish after {polls} polls")]
    TimedOut { job_id: String, polls: u32 },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Reconciliation of item {id} failed: {source}")]
    Reconciliation {
        id: CatalogId,
        #[source]
        source: StorageError,
    },
}

impl From<config::ConfigError> for EnrichError {
    fn from(err: config::ConfigError) -> Self {
        EnrichError::Configuration(err.to_string())
    }
}

/// Per-line decode errors; contained at the line boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Malformed result record ({reason}): {fragment}")]
    MalformedRecord { reason: String, fragment: String },

    #[error("Result record has no custom_id: {fragment}")]
    MissingCorrelation { fragment: String },

    #[error("Correlation id '{custom_id}' does not end in a catalog id")]
    InvalidCorrelation { custom_id: String },
}
