//! Bulk Processing Pipeline
//!
//! The stages of one bulk run, in order: render per-item requests
//! ([`RequestBuilder`]), upload them and open a remote job ([`BatchSubmitter`]),
//! poll the job until it settles ([`StatusPoller`]), then decode the result
//! file line by line ([`ResultDecoder`]). Reconciliation lives in
//! [`crate::reconcile`] and is shared with the synchronous path.

pub mod decode;
pub mod poll;
pub mod request;
pub mod submit;

pub use decode::{DecodeReport, Outcome, ResultDecoder, ResultRecord, SkippedLine};
pub use poll::{StatusPoller, WaitOutcome};
pub use request::{RequestBuilder, RequestRecord};
pub use submit::BatchSubmitter;

/// Processing window requested for every bulk job
pub const COMPLETION_WINDOW: &str = "24h";

/// Remote endpoint each bulk request line targets
pub const BATCH_ENDPOINT: &str = "/v1/chat/completions";
