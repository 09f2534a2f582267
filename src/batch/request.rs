//! Per-item request rendering.

use crate::catalog::{CatalogItem, PromptTemplate};
use crate::types::CorrelationId;
use tracing::{debug, warn};

/// Joins the item name to its external manufacturer identifiers
const MANUFACTURER_SUFFIX: &str = ", weitere Herstellernummer: ";

/// One rendered request, ready for the bulk artifact or a direct completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub correlation_id: CorrelationId,
    pub prompt: String,
}

/// Renders prompt templates into per-item requests
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    placeholder: String,
}

impl RequestBuilder {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
        }
    }

    /// Display name sent to the model: the item name followed by any
    /// manufacturer identifiers, each with a trailing space.
    pub fn descriptive_name(item: &CatalogItem) -> String {
        let ids: String = item
            .manufacturer_ids()
            .map(|id| format!("{} ", id))
            .collect();
        if ids.is_empty() {
            item.name.clone()
        } else {
            format!("{}{}{}", item.name, MANUFACTURER_SUFFIX, ids)
        }
    }

    /// Render one item.
    pub fn render(&self, item: &CatalogItem, template: &PromptTemplate) -> RequestRecord {
        // `replace` with an empty pattern would splice the name between every character.
        let prompt = if self.placeholder.is_empty() {
            template.text.clone()
        } else {
            template.text.replace(&self.placeholder, &Self::descriptive_name(item))
        };
        RequestRecord {
            correlation_id: CorrelationId::for_item(item.id),
            prompt,
        }
    }

    /// Render every item, preserving input order.
    ///
    /// A template without the placeholder is rendered unchanged for every item.
    pub fn build(&self, items: &[CatalogItem], template: &PromptTemplate) -> Vec<RequestRecord> {
        if !template.contains_placeholder(&self.placeholder) {
            warn!(
                prompt_key = template.key,
                placeholder = %self.placeholder,
                "Prompt template has no placeholder; every request gets the same text"
            );
        }

        let records: Vec<RequestRecord> = items
            .iter()
            .map(|item| self.render(item, template))
            .collect();
        debug!(count = records.len(), "Rendered requests");
        records
    }
}
