//! Run Orchestration
//!
//! Drives one invocation end to end: select items, render requests, then
//! either call the generative service item by item (synchronous mode) or
//! submit one bulk job and monitor it to completion (batch mode). A job left
//! running by an earlier invocation can be picked up again by id.
//!
//! The catalog store is opened for each unit of work (selection, one applied
//! result, one applied report) and dropped before the next remote call, so no
//! store handle is held across a poll interval.

use crate::batch::decode::decode_generated;
use crate::batch::{
    BatchSubmitter, DecodeReport, Outcome, RequestBuilder, ResultDecoder, ResultRecord,
    StatusPoller, WaitOutcome,
};
use crate::catalog::{CatalogItem, PromptTemplate, StoreOpener};
use crate::clock::Clock;
use crate::config::EnricherConfig;
use crate::error::{EnrichError, StorageError};
use crate::provider::{BatchApi, BatchJob, ChatMessage, CompletionOptions, ModelProviderClient};
use crate::reconcile::{ApplyAck, ReconcileSummary, ReconciliationEngine};
use crate::types::CatalogId;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Which items a run works on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Configured default count of pending items
    Default,
    /// Up to this many pending items
    Limit(usize),
    /// Exactly this item, whatever its state
    Item(CatalogId),
}

/// Processing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Sync,
    Batch,
}

/// Settings one run needs, taken from the loaded configuration
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub model: String,
    pub temperature: f32,
    pub artifact_dir: PathBuf,
    pub poll_interval: Duration,
    pub max_wait_units: u32,
    pub sync_failure_backoff: Duration,
    pub prompt_key: u32,
    pub default_limit: usize,
    pub placeholder: String,
}

impl RunSettings {
    pub fn from_config(config: &EnricherConfig) -> Self {
        Self {
            model: config.provider.model.clone(),
            temperature: config.provider.temperature,
            artifact_dir: config.batch.artifact_dir.clone(),
            poll_interval: config.batch.poll_interval(),
            max_wait_units: config.batch.max_wait_units,
            sync_failure_backoff: config.batch.sync_failure_backoff(),
            prompt_key: config.catalog.prompt_key,
            default_limit: config.catalog.default_limit,
            placeholder: config.catalog.placeholder.clone(),
        }
    }
}

/// What one invocation did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Remote job id, for batch runs
    pub job_id: Option<String>,
    /// Requests sent (or submitted in bulk)
    pub submitted: usize,
    /// Result lines decoded into records
    pub decoded: usize,
    /// Result lines skipped as undecodable
    pub skipped: usize,
    /// Items written and marked processed
    pub processed: usize,
    /// Items whose attempt was only stamped
    pub stamped: usize,
    /// Items whose result could not be written
    pub failed: usize,
}

impl RunSummary {
    fn absorb(&mut self, reconciled: ReconcileSummary) {
        self.processed += reconciled.processed;
        self.stamped += reconciled.stamped;
        self.failed += reconciled.failed;
    }
}

/// Wires the pipeline components together for one invocation
pub struct Orchestrator {
    stores: Arc<dyn StoreOpener>,
    batch_api: Arc<dyn BatchApi>,
    model: Arc<dyn ModelProviderClient>,
    clock: Arc<dyn Clock>,
    settings: RunSettings,
}

impl Orchestrator {
    pub fn new(
        stores: Arc<dyn StoreOpener>,
        batch_api: Arc<dyn BatchApi>,
        model: Arc<dyn ModelProviderClient>,
        clock: Arc<dyn Clock>,
        settings: RunSettings,
    ) -> Self {
        Self {
            stores,
            batch_api,
            model,
            clock,
            settings,
        }
    }

    pub async fn run(&self, mode: RunMode, selection: Selection) -> Result<RunSummary, EnrichError> {
        match mode {
            RunMode::Sync => self.run_sync(selection).await,
            RunMode::Batch => self.run_batch(selection).await,
        }
    }

    /// Send one request per item and apply each result as it arrives.
    pub async fn run_sync(&self, selection: Selection) -> Result<RunSummary, EnrichError> {
        let Some((items, template)) = self.load_work(selection)? else {
            return Ok(RunSummary::default());
        };
        let records = RequestBuilder::new(&self.settings.placeholder).build(&items, &template);
        let options = CompletionOptions {
            temperature: Some(self.settings.temperature),
            max_tokens: None,
        };

        let mut summary = RunSummary {
            submitted: records.len(),
            ..RunSummary::default()
        };
        let mut reconciled = ReconcileSummary::default();

        for (item, request) in items.iter().zip(records) {
            let catalog_id = item.id;
            info!(item_id = %catalog_id, model = self.model.model_name(), "Requesting content");

            let outcome = match self
                .model
                .complete(vec![ChatMessage::user(request.prompt)], options.clone())
                .await
            {
                Ok(response) => {
                    summary.decoded += 1;
                    match decode_generated(&response.content) {
                        Ok(content) => Outcome::Success(content),
                        Err(reason) => Outcome::Malformed(reason),
                    }
                }
                Err(e) => {
                    warn!(item_id = %catalog_id, error = %e, "Completion request failed");
                    self.clock.sleep(self.settings.sync_failure_backoff).await;
                    Outcome::Failure(e.to_string())
                }
            };

            let record = ResultRecord {
                correlation_id: request.correlation_id,
                catalog_id,
                outcome,
            };
            reconciled.record(&self.apply_one(&record));
        }

        summary.absorb(reconciled);
        info!(?summary, "Synchronous run finished");
        Ok(summary)
    }

    /// Submit one bulk job for the selected items, then monitor it.
    pub async fn run_batch(&self, selection: Selection) -> Result<RunSummary, EnrichError> {
        let Some((items, template)) = self.load_work(selection)? else {
            return Ok(RunSummary::default());
        };
        let records = RequestBuilder::new(&self.settings.placeholder).build(&items, &template);

        let submitter = BatchSubmitter::new(
            self.batch_api.clone(),
            self.clock.clone(),
            self.settings.artifact_dir.clone(),
            self.settings.model.clone(),
        );
        let job = submitter.submit(&records).await?;
        info!(
            job_id = %job.id,
            requests = records.len(),
            "Submitted batch job; resume later with `enricher resume --batch-id {}`",
            job.id
        );

        let mut summary = self.monitor(&job.id).await?;
        summary.submitted = records.len();
        Ok(summary)
    }

    /// Monitor an existing job and apply its results.
    pub async fn resume(&self, job_id: &str) -> Result<RunSummary, EnrichError> {
        info!(job_id, "Resuming batch job");
        self.monitor(job_id).await
    }

    async fn monitor(&self, job_id: &str) -> Result<RunSummary, EnrichError> {
        let poller = StatusPoller::new(self.batch_api.clone(), self.clock.clone());
        match poller
            .wait(job_id, self.settings.poll_interval, self.settings.max_wait_units)
            .await
        {
            WaitOutcome::Success(job) => self.process_completed(&job).await,
            WaitOutcome::TerminalFailure(job) => Err(EnrichError::TerminalJobFailure {
                job_id: job.id,
                status: job.status.to_string(),
            }),
            WaitOutcome::QueryFailure(reason) => Err(EnrichError::StatusQueryFailed {
                job_id: job_id.to_string(),
                reason,
            }),
            WaitOutcome::TimedOut { polls } => {
                warn!(
                    job_id,
                    polls,
                    "Batch job still running; resume with `enricher resume --batch-id {}`",
                    job_id
                );
                Err(EnrichError::TimedOut {
                    job_id: job_id.to_string(),
                    polls,
                })
            }
        }
    }

    async fn process_completed(&self, job: &BatchJob) -> Result<RunSummary, EnrichError> {
        let output_id = job
            .output_reference()
            .ok_or_else(|| EnrichError::TerminalJobFailure {
                job_id: job.id.clone(),
                status: format!("{} without output file", job.status),
            })?;
        let raw = self.batch_api.file_content(output_id).await?;
        let mut report = ResultDecoder::decode_all(&raw);

        // Requests the service rejected outright are listed in a separate file.
        if let Some(error_id) = job.error_file_id.as_deref() {
            match self.batch_api.file_content(error_id).await {
                Ok(raw_errors) => {
                    let errors = ResultDecoder::decode_all(&raw_errors);
                    report.records.extend(errors.records);
                    report.skipped.extend(errors.skipped);
                }
                Err(e) => warn!(job_id = %job.id, error_file = error_id, error = %e, "Could not fetch error file"),
            }
        }

        let summary = self.reconcile_report(&report)?;
        info!(job_id = %job.id, ?summary, "Batch results applied");
        Ok(RunSummary {
            job_id: Some(job.id.clone()),
            ..summary
        })
    }

    fn reconcile_report(&self, report: &DecodeReport) -> Result<RunSummary, EnrichError> {
        let engine = ReconciliationEngine::new(self.stores.open()?, self.clock.clone());
        let (_, reconciled) = engine.apply_all(&report.records);
        let mut summary = RunSummary {
            decoded: report.records.len(),
            skipped: report.skipped.len(),
            ..RunSummary::default()
        };
        summary.absorb(reconciled);
        Ok(summary)
    }

    /// Apply a single result with a store opened just for it.
    fn apply_one(&self, record: &ResultRecord) -> ApplyAck {
        match self.stores.open() {
            Ok(store) => ReconciliationEngine::new(store, self.clock.clone()).apply(record),
            Err(e) => {
                error!(item_id = %record.catalog_id, error = %e, "Catalog store unavailable");
                ApplyAck::WriteFailed {
                    id: record.catalog_id,
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Selected items plus the prompt template, or `None` when there is
    /// nothing to do.
    fn load_work(
        &self,
        selection: Selection,
    ) -> Result<Option<(Vec<CatalogItem>, PromptTemplate)>, EnrichError> {
        let store = self.stores.open()?;
        let items = match selection {
            Selection::Item(id) => {
                let item = store
                    .fetch_item(id)?
                    .ok_or(StorageError::ItemNotFound(id))?;
                vec![item]
            }
            Selection::Limit(limit) => store.fetch_pending(limit)?,
            Selection::Default => store.fetch_pending(self.settings.default_limit)?,
        };
        if items.is_empty() {
            warn!(?selection, "No pending catalog items");
            return Ok(None);
        }

        let template = store
            .fetch_prompt(self.settings.prompt_key)?
            .ok_or_else(|| {
                EnrichError::Configuration(format!(
                    "No prompt template stored for key {}",
                    self.settings.prompt_key
                ))
            })?;
        if template.is_blank() {
            error!(prompt_key = template.key, "Prompt template is empty");
            return Err(EnrichError::Configuration(format!(
                "Prompt template {} is empty",
                template.key
            )));
        }

        info!(count = items.len(), prompt_key = template.key, "Selected catalog items");
        Ok(Some((items, template)))
    }
}
