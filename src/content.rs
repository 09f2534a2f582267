//! Generated content payload
//!
//! The shape of the JSON object the generative service is prompted to return.
//! Field names follow the storefront's prompt contract; every field is optional
//! and tolerant of `null`, numbers where text is expected, or a bare string where
//! a list is expected.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One vehicle compatibility row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityRow {
    #[serde(rename = "marke", default, deserialize_with = "lenient_text")]
    pub brand: String,
    #[serde(rename = "modell", default, deserialize_with = "lenient_text")]
    pub model: String,
    #[serde(rename = "baujahr_von", default, deserialize_with = "lenient_text")]
    pub year_from: String,
    #[serde(rename = "baujahr_bis", default, deserialize_with = "lenient_text")]
    pub year_to: String,
    #[serde(rename = "motorvarianten", default, deserialize_with = "lenient_list")]
    pub engine_variants: Vec<String>,
    #[serde(rename = "bemerkung", default, deserialize_with = "lenient_text")]
    pub remark: String,
}

/// Decoded success payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    #[serde(rename = "titel", default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(rename = "SEO", default, deserialize_with = "lenient_text")]
    pub seo: String,
    #[serde(rename = "Kurzbeschreibung", default, deserialize_with = "lenient_text")]
    pub short_description: String,
    #[serde(rename = "Verkaufstext", default, deserialize_with = "lenient_text")]
    pub sales_text: String,
    #[serde(rename = "OE-Nummer", default, deserialize_with = "lenient_list")]
    pub reference_numbers: Vec<String>,
    #[serde(rename = "Quelle", default, deserialize_with = "lenient_list")]
    pub sources: Vec<String>,
    #[serde(rename = "kompatibilität", default, deserialize_with = "lenient_rows")]
    pub compatibility: Vec<CompatibilityRow>,
}

impl GeneratedContent {
    /// True when the payload carries nothing worth writing
    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty()
            && self.seo.trim().is_empty()
            && self.short_description.trim().is_empty()
            && self.sales_text.trim().is_empty()
            && self.reference_numbers.is_empty()
            && self.sources.is_empty()
            && self.compatibility.is_empty()
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        other => other.to_string(),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(&value))
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let entries = match value {
        Value::Array(entries) => entries.iter().map(value_to_text).collect(),
        Value::Null => Vec::new(),
        single => vec![value_to_text(&single)],
    };
    Ok(entries
        .into_iter()
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect())
}

fn lenient_rows<'de, D>(deserializer: D) -> Result<Vec<CompatibilityRow>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(entries) = value else {
        return Ok(Vec::new());
    };
    // non-object rows are dropped rather than failing the whole payload
    Ok(entries
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}
