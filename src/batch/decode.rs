//! Result file decoding
//!
//! A result file holds one JSON object per line. Each line carries the
//! correlation id of its request and either a response envelope or an error
//! envelope. The generated content sits inside the envelope at
//! `body.choices[0].message.content` as a JSON document encoded in a string,
//! so a success line is decoded twice.
//!
//! Bad lines are skipped and logged; they never stop the rest of the file.

use crate::content::GeneratedContent;
use crate::error::DecodeError;
use crate::logging::fragment;
use crate::types::{CatalogId, CorrelationId};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

const FRAGMENT_CHARS: usize = 100;

/// Decoded outcome of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Usable generated content
    Success(GeneratedContent),
    /// The remote service reported an error for this request
    Failure(String),
    /// The line was addressable but its payload could not be used
    Malformed(String),
}

/// One decoded result line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRecord {
    pub correlation_id: CorrelationId,
    pub catalog_id: CatalogId,
    pub outcome: Outcome,
}

/// A line the decoder could not attribute to a catalog item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number in the result file
    pub line_number: usize,
    pub error: DecodeError,
}

/// Everything decoded from one result file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeReport {
    pub records: Vec<ResultRecord>,
    pub skipped: Vec<SkippedLine>,
}

#[derive(Debug, Deserialize)]
struct ResultLine {
    #[serde(default)]
    custom_id: Option<String>,
    #[serde(default)]
    response: Option<ResponseEnvelope>,
    #[serde(default)]
    error: Option<ErrorEnvelope>,
}

#[derive(Debug, Deserialize)]
struct ResponseEnvelope {
    #[serde(default)]
    status_code: Option<u16>,
    #[serde(default)]
    body: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorEnvelope {
    fn describe(&self) -> String {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => format!("{}: {}", code, message),
            (None, Some(message)) => message.clone(),
            (Some(code), None) => code.clone(),
            (None, None) => "unspecified error".to_string(),
        }
    }
}

/// Turns raw result file content into [`ResultRecord`]s
pub struct ResultDecoder;

impl ResultDecoder {
    /// Lazily decode every non-blank line, logging and dropping bad ones.
    pub fn decode(raw: &str) -> impl Iterator<Item = ResultRecord> + '_ {
        classify_lines(raw).filter_map(|(line_number, line, result)| match result {
            Ok(record) => Some(record),
            Err(error) => {
                log_skip(line_number, line, &error);
                None
            }
        })
    }

    /// Decode the whole file, keeping a record of skipped lines.
    pub fn decode_all(raw: &str) -> DecodeReport {
        let mut report = DecodeReport::default();
        for (line_number, line, result) in classify_lines(raw) {
            match result {
                Ok(record) => report.records.push(record),
                Err(error) => {
                    log_skip(line_number, line, &error);
                    report.skipped.push(SkippedLine { line_number, error });
                }
            }
        }
        debug!(
            decoded = report.records.len(),
            skipped = report.skipped.len(),
            "Decoded result file"
        );
        report
    }

    /// Decode one result line.
    pub fn decode_line(line: &str) -> Result<ResultRecord, DecodeError> {
        let parsed: ResultLine =
            serde_json::from_str(line).map_err(|e| DecodeError::MalformedRecord {
                reason: e.to_string(),
                fragment: fragment(line, FRAGMENT_CHARS),
            })?;

        let raw_id = parsed
            .custom_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DecodeError::MissingCorrelation {
                fragment: fragment(line, FRAGMENT_CHARS),
            })?;
        let correlation_id = CorrelationId::from_raw(raw_id);
        let catalog_id = correlation_id.catalog_id()?;

        let outcome = match (parsed.response, parsed.error) {
            (Some(response), _) if response.body.is_some() => response_outcome(response),
            (_, Some(error)) => Outcome::Failure(error.describe()),
            (Some(response), None) => Outcome::Malformed(format!(
                "response without body (status {})",
                response
                    .status_code
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            )),
            (None, None) => Outcome::Malformed("neither response nor error present".to_string()),
        };

        Ok(ResultRecord {
            correlation_id,
            catalog_id,
            outcome,
        })
    }
}

fn classify_lines(
    raw: &str,
) -> impl Iterator<Item = (usize, &str, Result<ResultRecord, DecodeError>)> + '_ {
    raw.lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .map(|(line_number, line)| (line_number, line, ResultDecoder::decode_line(line)))
}

fn log_skip(line_number: usize, line: &str, error: &DecodeError) {
    match error {
        DecodeError::InvalidCorrelation { custom_id } => warn!(
            line = line_number,
            custom_id = %custom_id,
            "Skipping result line with unusable correlation id"
        ),
        _ => warn!(
            line = line_number,
            fragment = %fragment(line, FRAGMENT_CHARS),
            error = %error,
            "Skipping result line"
        ),
    }
}

fn response_outcome(response: ResponseEnvelope) -> Outcome {
    let Some(body) = response.body else {
        return Outcome::Malformed("response without body".to_string());
    };

    // Per-request errors can also arrive inside a non-2xx response envelope.
    if let Some(error) = body.get("error").filter(|error| !error.is_null()) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Outcome::Failure(message);
    }
    if let Some(code) = response.status_code.filter(|code| !(200..300).contains(code)) {
        return Outcome::Failure(format!("request returned status {}", code));
    }

    let Some(content) = body
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
    else {
        return Outcome::Malformed("response body has no choices[0].message.content".to_string());
    };

    match decode_generated(content) {
        Ok(generated) => Outcome::Success(generated),
        Err(reason) => Outcome::Malformed(reason),
    }
}

/// Decode the generated JSON document a model returned as text.
///
/// A surrounding Markdown code fence (```` ```json ```` or ```` ``` ````) is
/// removed first.
pub fn decode_generated(content: &str) -> Result<GeneratedContent, String> {
    let inner = strip_code_fence(content);
    serde_json::from_str(inner).map_err(|e| {
        format!(
            "generated content is not a JSON object ({}): {}",
            e,
            fragment(inner, FRAGMENT_CHARS)
        )
    })
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
