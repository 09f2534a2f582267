//! Shared fixtures for integration tests
//!
//! A scripted stand-in for the generative service (both the batch endpoints and
//! single completions) plus catalog item builders.

use async_trait::async_trait;
use catalog_enricher::catalog::{CatalogItem, ItemContent, ProcessingState, PromptTemplate};
use catalog_enricher::clock::ManualClock;
use catalog_enricher::error::TransportError;
use catalog_enricher::orchestrator::{Orchestrator, RunSettings};
use catalog_enricher::provider::{
    BatchApi, BatchJob, BatchStatus, ChatMessage, CompletionOptions, CompletionResponse,
    ModelProviderClient, RemoteFile,
};
use catalog_enricher::types::CatalogId;
use catalog_enricher::{CatalogStore, SledCatalogStore, SledStoreOpener};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const BACKOFF: Duration = Duration::from_millis(1000);

/// Scripted generative service
#[derive(Default)]
pub struct FakeService {
    /// Status returned per poll; the last entry repeats
    pub statuses: Mutex<VecDeque<BatchStatus>>,
    pub fail_status_query: Mutex<bool>,
    pub output: Mutex<String>,
    pub error_output: Mutex<Option<String>>,
    /// Contents of every uploaded artifact
    pub uploads: Mutex<Vec<String>>,
    pub status_queries: Mutex<u32>,
    /// Replies for single completions, in order
    pub completions: Mutex<VecDeque<Result<String, String>>>,
    /// Prompts received by single completions
    pub prompts: Mutex<Vec<String>>,
    /// Catalog directory another invocation opens on every status query
    pub concurrent_reader: Mutex<Option<PathBuf>>,
    /// Outcome of each of those opens: pending count or the open error
    pub concurrent_reads: Mutex<Vec<Result<usize, String>>>,
}

impl FakeService {
    pub fn with_statuses(statuses: &[&str]) -> Self {
        let service = Self::default();
        *service.statuses.lock() = statuses.iter().map(|s| BatchStatus::from(*s)).collect();
        service
    }

    pub fn set_output(&self, lines: &[String]) {
        *self.output.lock() = lines.join("\n");
    }

    fn job(&self, status: BatchStatus) -> BatchJob {
        let completed = status == BatchStatus::Completed;
        BatchJob {
            id: "batch_test".to_string(),
            status,
            output_file_id: completed.then(|| "file-out".to_string()),
            error_file_id: if completed && self.error_output.lock().is_some() {
                Some("file-err".to_string())
            } else {
                None
            },
        }
    }
}

#[async_trait]
impl BatchApi for FakeService {
    async fn upload_file(&self, path: &Path) -> Result<RemoteFile, TransportError> {
        self.uploads.lock().push(std::fs::read_to_string(path)?);
        Ok(RemoteFile {
            id: "file-in".to_string(),
            filename: path.file_name().map(|n| n.to_string_lossy().into_owned()),
        })
    }

    async fn create_batch(
        &self,
        _input_file_id: &str,
        _endpoint: &str,
        _completion_window: &str,
    ) -> Result<BatchJob, TransportError> {
        Ok(self.job(BatchStatus::Validating))
    }

    async fn retrieve_batch(&self, _batch_id: &str) -> Result<BatchJob, TransportError> {
        *self.status_queries.lock() += 1;
        let reader = self.concurrent_reader.lock().clone();
        if let Some(path) = reader {
            let read = SledCatalogStore::new(&path)
                .and_then(|store| store.fetch_pending(100))
                .map(|items| items.len())
                .map_err(|e| e.to_string());
            self.concurrent_reads.lock().push(read);
        }
        if *self.fail_status_query.lock() {
            return Err(TransportError::Request("connection refused".to_string()));
        }
        let status = {
            let mut statuses = self.statuses.lock();
            if statuses.len() > 1 {
                statuses.pop_front()
            } else {
                statuses.front().cloned()
            }
        };
        Ok(self.job(status.unwrap_or(BatchStatus::InProgress)))
    }

    async fn file_content(&self, file_id: &str) -> Result<String, TransportError> {
        match file_id {
            "file-out" => Ok(self.output.lock().clone()),
            "file-err" => Ok(self.error_output.lock().clone().unwrap_or_default()),
            other => Err(TransportError::Status {
                status: 404,
                body: format!("no file {}", other),
            }),
        }
    }
}

#[async_trait]
impl ModelProviderClient for FakeService {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        _options: CompletionOptions,
    ) -> Result<CompletionResponse, TransportError> {
        if let Some(message) = messages.first() {
            self.prompts.lock().push(message.content.clone());
        }
        match self.completions.lock().pop_front() {
            Some(Ok(content)) => Ok(CompletionResponse {
                content,
                model: "fake".to_string(),
                finish_reason: Some("stop".to_string()),
            }),
            Some(Err(message)) => Err(TransportError::RateLimited(message)),
            None => Err(TransportError::Request("no scripted reply".to_string())),
        }
    }

    fn model_name(&self) -> &str {
        "fake"
    }
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

/// A pending item; `age_days` orders the queue (larger is older).
pub fn pending_item(id: u64, age_days: i64) -> CatalogItem {
    CatalogItem {
        id: CatalogId(id),
        name: format!("Bremsscheibe {}", id),
        ean: format!("40000000{:05}", id),
        upc: String::new(),
        sku: format!("BS-{}", id),
        active: true,
        price: 49.0,
        quantity: 4,
        listed_at: epoch() - ChronoDuration::days(age_days),
        state: ProcessingState::Unprocessed,
        last_attempt_at: None,
        content: ItemContent {
            description: format!("Original {}", id),
            ..ItemContent::default()
        },
        marketplace_active: false,
        marketplace_revise: false,
    }
}

pub fn success_line(id: u64, content: &str) -> String {
    serde_json::json!({
        "id": format!("batch_req_{}", id),
        "custom_id": format!("product-id-{}", id),
        "response": {
            "status_code": 200,
            "body": {"choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]}
        },
        "error": null
    })
    .to_string()
}

pub fn error_line(id: u64, message: &str) -> String {
    serde_json::json!({
        "custom_id": format!("product-id-{}", id),
        "response": null,
        "error": {"code": "rate_limit_exceeded", "message": message}
    })
    .to_string()
}

pub struct Harness {
    pub temp_dir: TempDir,
    pub store_path: PathBuf,
    pub service: Arc<FakeService>,
    pub clock: Arc<ManualClock>,
    pub orchestrator: Orchestrator,
}

impl Harness {
    /// Open the catalog the way a separate invocation would.
    pub fn store(&self) -> SledCatalogStore {
        SledCatalogStore::new(&self.store_path).unwrap()
    }
}

pub fn settings(artifact_dir: &Path) -> RunSettings {
    RunSettings {
        model: "gpt-5.1".to_string(),
        temperature: 0.0,
        artifact_dir: artifact_dir.to_path_buf(),
        poll_interval: POLL_INTERVAL,
        max_wait_units: 5,
        sync_failure_backoff: BACKOFF,
        prompt_key: 1,
        default_limit: 3,
        placeholder: "{name}".to_string(),
    }
}

/// Store seeded with `items` and prompt `template`, driven by `service`.
pub fn harness(items: &[CatalogItem], template: Option<&str>, service: FakeService) -> Harness {
    let temp_dir = TempDir::new().unwrap();
    let store_path = temp_dir.path().join("catalog");
    {
        let store = SledCatalogStore::new(&store_path).unwrap();
        store.put_items(items).unwrap();
        if let Some(text) = template {
            store.put_prompt(&PromptTemplate::new(1, text)).unwrap();
        }
    }
    let service = Arc::new(service);
    let clock = Arc::new(ManualClock::new(epoch() + ChronoDuration::days(30)));
    let orchestrator = Orchestrator::new(
        Arc::new(SledStoreOpener::new(&store_path)),
        service.clone(),
        service.clone(),
        clock.clone(),
        settings(&temp_dir.path().join("batch_files")),
    );
    Harness {
        temp_dir,
        store_path,
        service,
        clock,
        orchestrator,
    }
}
