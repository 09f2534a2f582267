//! Identifier types shared across the enrichment pipeline.
//!
//! A catalog item is addressed by a numeric [`CatalogId`]. Bulk requests carry an
//! opaque [`CorrelationId`] of the form `product-id-<id>` so that each result line
//! can be matched back to exactly one catalog record.

use crate::error::DecodeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix of every correlation id emitted by the request builder.
pub const CORRELATION_PREFIX: &str = "product-id-";

/// Stable identifier of a catalog item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogId(pub u64);

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CatalogId {
    fn from(id: u64) -> Self {
        CatalogId(id)
    }
}

/// Correlation id tying a bulk request line to its result line
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Derive the correlation id for a catalog item.
    pub fn for_item(id: CatalogId) -> Self {
        CorrelationId(format!("{}{}", CORRELATION_PREFIX, id.0))
    }

    /// Wrap a raw correlation string as received from the remote service.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        CorrelationId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recover the catalog id embedded in the correlation id.
    ///
    /// The id is the text after the final `-`; it must parse as an unsigned integer.
    pub fn catalog_id(&self) -> Result<CatalogId, DecodeError> {
        let tail = self.0.rsplit('-').next().unwrap_or_default();
        tail.trim()
            .parse::<u64>()
            .map(CatalogId)
            .map_err(|_| DecodeError::InvalidCorrelation {
                custom_id: self.0.clone(),
            })
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
