//! HTML rendering of the generated description block.

use crate::content::{CompatibilityRow, GeneratedContent};
use regex::Regex;
use std::fmt::Write;
use std::sync::OnceLock;

const COMPATIBILITY_HEADING: &str = "Kompatibilitätsliste (ohne Gewähr)";
const COMPATIBILITY_COLUMNS: [&str; 5] = ["Marke", "Modell", "Baujahr", "Motorvarianten", "Bemerkung"];

fn sentence_break() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\.\s+").expect("sentence break pattern is valid"))
}

/// Insert a line break after every sentence-ending period.
pub fn sales_html(text: &str) -> String {
    sentence_break().replace_all(text, ".<br/>").into_owned()
}

/// The generated block appended to an item description.
pub fn generated_block(content: &GeneratedContent) -> String {
    let mut block = String::from("<div class='addedTextAi'>");
    let _ = write!(
        block,
        "<div class='item-desc-text'>{}</div>",
        sales_html(&content.sales_text)
    );
    if !content.reference_numbers.is_empty() {
        let _ = write!(
            block,
            "<div class='item-oe-nummer'>OE-Nummer: {}</div>",
            content.reference_numbers.join(", ")
        );
    }
    if !content.compatibility.is_empty() {
        let _ = write!(
            block,
            "<div class='item-compability-block'><h4>{}</h4>{}</div>",
            COMPATIBILITY_HEADING,
            compatibility_table(&content.compatibility)
        );
    }
    if !content.sources.is_empty() {
        let _ = write!(
            block,
            "<div class='item-quelle'>Quelle: <br/>{}</div>",
            content.sources.join(", ")
        );
    }
    block.push_str("</div>");
    block
}

/// Wrap the prior description and append the generated block.
pub fn combined_description(previous: &str, block: &str) -> String {
    format!("<div class='item-desc-text'>{}</div> {}", previous, block)
}

fn compatibility_table(rows: &[CompatibilityRow]) -> String {
    let mut table = String::from("<table class='item-compability-table'><tr>");
    for column in COMPATIBILITY_COLUMNS {
        let _ = write!(table, "<th>{}</th>", column);
    }
    table.push_str("</tr>");
    for row in rows {
        let _ = write!(
            table,
            "<tr><td>{}</td><td>{}</td><td>{} - {}</td><td>{}</td><td>{}</td></tr>",
            row.brand,
            row.model,
            row.year_from,
            row.year_to,
            row.engine_variants.join("<br>"),
            row.remark
        );
    }
    table.push_str("</table>");
    table
}
