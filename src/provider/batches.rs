//! Files and batches endpoints of the generative service.

use crate::error::TransportError;
use crate::provider::{ensure_success, map_http_error, OpenAIClient};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Remote job status as reported by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BatchStatus {
    Validating,
    Queued,
    InProgress,
    Finalizing,
    Completed,
    Failed,
    Expired,
    Cancelling,
    Cancelled,
    Other(String),
}

/// How the poller treats a status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Transient,
    Succeeded,
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BatchStatus::Validating => "validating",
            BatchStatus::Queued => "queued",
            BatchStatus::InProgress => "in_progress",
            BatchStatus::Finalizing => "finalizing",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
            BatchStatus::Expired => "expired",
            BatchStatus::Cancelling => "cancelling",
            BatchStatus::Cancelled => "cancelled",
            BatchStatus::Other(raw) => raw,
        }
    }

    /// Unrecognised statuses are treated as transient
    pub fn classify(&self) -> StatusClass {
        match self {
            BatchStatus::Completed => StatusClass::Succeeded,
            BatchStatus::Failed | BatchStatus::Expired | BatchStatus::Cancelled => {
                StatusClass::Failed
            }
            BatchStatus::Validating
            | BatchStatus::Queued
            | BatchStatus::InProgress
            | BatchStatus::Finalizing
            | BatchStatus::Cancelling
            | BatchStatus::Other(_) => StatusClass::Transient,
        }
    }
}

impl From<String> for BatchStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "validating" => BatchStatus::Validating,
            "queued" => BatchStatus::Queued,
            "in_progress" => BatchStatus::InProgress,
            "finalizing" => BatchStatus::Finalizing,
            "completed" => BatchStatus::Completed,
            "failed" => BatchStatus::Failed,
            "expired" => BatchStatus::Expired,
            "cancelling" => BatchStatus::Cancelling,
            "cancelled" => BatchStatus::Cancelled,
            _ => BatchStatus::Other(raw),
        }
    }
}

impl From<&str> for BatchStatus {
    fn from(raw: &str) -> Self {
        BatchStatus::from(raw.to_string())
    }
}

impl From<BatchStatus> for String {
    fn from(status: BatchStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local handle on a remote batch job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchJob {
    pub id: String,
    pub status: BatchStatus,
    #[serde(default)]
    pub output_file_id: Option<String>,
    #[serde(default)]
    pub error_file_id: Option<String>,
}

impl BatchJob {
    /// Output file id; only meaningful once the job has completed
    pub fn output_reference(&self) -> Option<&str> {
        match self.status {
            BatchStatus::Completed => self.output_file_id.as_deref(),
            _ => None,
        }
    }
}

/// Uploaded file handle
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
}

/// Bulk job operations of the generative service
#[async_trait]
pub trait BatchApi: Send + Sync {
    /// Upload a newline-delimited request file for batch use
    async fn upload_file(&self, path: &Path) -> Result<RemoteFile, TransportError>;

    /// Create a job over an uploaded input file
    async fn create_batch(
        &self,
        input_file_id: &str,
        endpoint: &str,
        completion_window: &str,
    ) -> Result<BatchJob, TransportError>;

    /// Query the current state of a job
    async fn retrieve_batch(&self, batch_id: &str) -> Result<BatchJob, TransportError>;

    /// Download the text content of a file
    async fn file_content(&self, file_id: &str) -> Result<String, TransportError>;
}

#[derive(Serialize)]
struct CreateBatchRequest<'a> {
    input_file_id: &'a str,
    endpoint: &'a str,
    completion_window: &'a str,
}

#[async_trait]
impl BatchApi for OpenAIClient {
    async fn upload_file(&self, path: &Path) -> Result<RemoteFile, TransportError> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "batch_input.jsonl".to_string());
        let form = Form::new()
            .text("purpose", "batch")
            .part("file", Part::bytes(bytes).file_name(file_name));

        let response = self
            .http()
            .post(self.url("/files"))
            .header("Authorization", self.bearer())
            .multipart(form)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = ensure_success(response).await?;

        response
            .json()
            .await
            .map_err(|e| TransportError::Decode(format!("Failed to parse file object: {}", e)))
    }

    async fn create_batch(
        &self,
        input_file_id: &str,
        endpoint: &str,
        completion_window: &str,
    ) -> Result<BatchJob, TransportError> {
        let request = CreateBatchRequest {
            input_file_id,
            endpoint,
            completion_window,
        };
        let response = self
            .http()
            .post(self.url("/batches"))
            .header("Authorization", self.bearer())
            .json(&request)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = ensure_success(response).await?;

        response
            .json()
            .await
            .map_err(|e| TransportError::Decode(format!("Failed to parse batch object: {}", e)))
    }

    async fn retrieve_batch(&self, batch_id: &str) -> Result<BatchJob, TransportError> {
        let response = self
            .http()
            .get(self.url(&format!("/batches/{}", batch_id)))
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(map_http_error)?;
        let response = ensure_success(response).await?;

        response
            .json()
            .await
            .map_err(|e| TransportError::Decode(format!("Failed to parse batch object: {}", e)))
    }

    async fn file_content(&self, file_id: &str) -> Result<String, TransportError> {
        let response = self
            .http()
            .get(self.url(&format!("/files/{}/content", file_id)))
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(map_http_error)?;
        let response = ensure_success(response).await?;

        response.text().await.map_err(map_http_error)
    }
}
