//! Bounded status polling of a remote job.

use crate::clock::Clock;
use crate::provider::{BatchApi, BatchJob, StatusClass};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// How a wait on a remote job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Job completed; its output file can be fetched
    Success(BatchJob),
    /// Job reached a terminal non-success status
    TerminalFailure(BatchJob),
    /// A status query failed; polling stopped
    QueryFailure(String),
    /// The poll budget ran out while the job was still transient
    TimedOut { polls: u32 },
}

/// Repeatedly queries a job's status until it settles
pub struct StatusPoller {
    api: Arc<dyn BatchApi>,
    clock: Arc<dyn Clock>,
}

impl StatusPoller {
    pub fn new(api: Arc<dyn BatchApi>, clock: Arc<dyn Clock>) -> Self {
        Self { api, clock }
    }

    /// Poll `job_id` at most `max_wait_units` times, sleeping `poll_interval`
    /// between queries. There is no sleep after the final query.
    pub async fn wait(
        &self,
        job_id: &str,
        poll_interval: Duration,
        max_wait_units: u32,
    ) -> WaitOutcome {
        for poll in 1..=max_wait_units {
            let job = match self.api.retrieve_batch(job_id).await {
                Ok(job) => job,
                Err(e) => {
                    error!(job_id, poll, error = %e, "Batch status query failed");
                    return WaitOutcome::QueryFailure(e.to_string());
                }
            };

            match job.status.classify() {
                StatusClass::Succeeded => {
                    info!(job_id, poll, "Batch job completed");
                    return WaitOutcome::Success(job);
                }
                StatusClass::Failed => {
                    error!(job_id, poll, status = %job.status, "Batch job failed");
                    return WaitOutcome::TerminalFailure(job);
                }
                StatusClass::Transient => {
                    info!(
                        job_id,
                        poll,
                        max_wait_units,
                        status = %job.status,
                        "Batch job still running"
                    );
                }
            }

            if poll < max_wait_units {
                self.clock.sleep(poll_interval).await;
            }
        }

        warn!(job_id, polls = max_wait_units, "Gave up waiting for batch job");
        WaitOutcome::TimedOut {
            polls: max_wait_units,
        }
    }
}
