//! Bulk artifact writing and job creation.

use crate::batch::request::RequestRecord;
use crate::batch::{BATCH_ENDPOINT, COMPLETION_WINDOW};
use crate::clock::Clock;
use crate::error::TransportError;
use crate::provider::{BatchApi, BatchJob, ChatMessage};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const MAX_NAME_ATTEMPTS: u32 = 1000;

/// One line of the newline-delimited request artifact
#[derive(Debug, Serialize)]
struct RequestLine<'a> {
    custom_id: &'a str,
    method: &'static str,
    url: &'static str,
    body: RequestBody<'a>,
}

#[derive(Debug, Serialize)]
struct RequestBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

/// Writes request records to a local artifact, uploads it and opens a job
pub struct BatchSubmitter {
    api: Arc<dyn BatchApi>,
    clock: Arc<dyn Clock>,
    artifact_dir: PathBuf,
    model: String,
}

impl BatchSubmitter {
    pub fn new(
        api: Arc<dyn BatchApi>,
        clock: Arc<dyn Clock>,
        artifact_dir: impl Into<PathBuf>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api,
            clock,
            artifact_dir: artifact_dir.into(),
            model: model.into(),
        }
    }

    /// Submit one job covering all records.
    ///
    /// Transport failures are returned as-is; nothing is retried here.
    pub async fn submit(&self, records: &[RequestRecord]) -> Result<BatchJob, TransportError> {
        let artifact = self.write_artifact(records)?;
        info!(path = %artifact.display(), requests = records.len(), "Wrote batch artifact");

        let file = self.api.upload_file(&artifact).await?;
        debug!(file_id = %file.id, "Uploaded batch artifact");

        let job = self
            .api
            .create_batch(&file.id, BATCH_ENDPOINT, COMPLETION_WINDOW)
            .await?;
        info!(job_id = %job.id, status = %job.status, "Created batch job");
        Ok(job)
    }

    /// Serialize records into a fresh artifact file under the artifact directory.
    pub fn write_artifact(&self, records: &[RequestRecord]) -> Result<PathBuf, TransportError> {
        fs::create_dir_all(&self.artifact_dir)?;
        let (path, file) = self.create_unique_file()?;

        let mut writer = BufWriter::new(file);
        for record in records {
            let line = RequestLine {
                custom_id: record.correlation_id.as_str(),
                method: "POST",
                url: BATCH_ENDPOINT,
                body: RequestBody {
                    model: &self.model,
                    messages: vec![ChatMessage::user(record.prompt.clone())],
                },
            };
            serde_json::to_writer(&mut writer, &line)
                .map_err(|e| TransportError::Decode(format!("Failed to encode request: {}", e)))?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(path)
    }

    // Two runs never share an artifact: names carry a timestamp and a
    // counter, and the file is created exclusively.
    fn create_unique_file(&self) -> Result<(PathBuf, File), TransportError> {
        let stamp = self.clock.now().format("%Y%m%d%H%M%S%3f").to_string();
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = artifact_path(&self.artifact_dir, &stamp, attempt);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(TransportError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!(
                "No free artifact name in {} for stamp {}",
                self.artifact_dir.display(),
                stamp
            ),
        )))
    }
}

fn artifact_path(dir: &Path, stamp: &str, attempt: u32) -> PathBuf {
    if attempt == 0 {
        dir.join(format!("batch_input_{}.jsonl", stamp))
    } else {
        dir.join(format!("batch_input_{}_{}.jsonl", stamp, attempt))
    }
}
