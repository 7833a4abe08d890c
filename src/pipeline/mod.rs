//! Extraction and load pipeline
//!
//! One invocation flows through these stages:
//!
//! 1. **Pre-check**: [`controller::RunController`] skips ranges already in the store
//! 2. **Split**: [`split::split`] turns the server estimation into job sub-ranges
//! 3. **Lifecycle**: [`lifecycle::JobLifecycle`] creates each job and polls it
//! 4. **Ingest**: [`ingest::Ingestor`] downloads, filters and loads each part
//! 5. **Cleanup**: the lifecycle deletes the job's parts on the server
//!
//! Stages 2-5 form one attempt. [`retry::retry_with_backoff`] repeats failed
//! attempts with linear backoff.
//!
//! # Error Handling
//!
//! Every stage returns [`PipelineError`]. Its [`ErrorKind`] decides whether
//! another attempt can help:
//! - Transport, HTTP status and remote job failures are retryable
//! - Zero feasible days, missing column types and invalid state transitions are fatal

use crate::api::ApiError;
use crate::store::StoreError;
use crate::DateRange;
use std::time::Duration;

pub mod controller;
pub mod ingest;
pub mod job;
pub mod lifecycle;
pub mod retry;
pub mod split;

pub use controller::{RunController, RunOutcome, RunSummary};
pub use job::{JobRequest, JobStatus};
pub use retry::RetryPolicy;

/// Whether retrying an attempt can succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transient; the attempt may be repeated
    Retryable,
    /// Repeating the attempt cannot help
    Fatal,
}

/// Pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The server reports zero feasible days
    #[error("export API can't load {range}: max_possible_day_quantity = 0")]
    Unsplittable {
        /// Requested range
        range: DateRange,
    },

    /// Range ends before it starts
    #[error("invalid range {range}: start is after end")]
    InvalidRange {
        /// Offending range
        range: DateRange,
    },

    /// Export API error
    #[error("export API error: {0}")]
    Api(#[from] ApiError),

    /// Store error
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Server reports the job failed
    #[error("job {request_id} failed on the server with status {status}")]
    JobFailed {
        /// Server-side job identifier
        request_id: u64,
        /// Reported status
        status: String,
    },

    /// Job was still not processed after the configured number of checks
    #[error("job {request_id} not processed after {polls} status checks")]
    PollLimitExceeded {
        /// Server-side job identifier
        request_id: u64,
        /// Checks performed
        polls: u32,
    },

    /// Job status edge not allowed by the lifecycle
    #[error("invalid job status transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// Current status
        from: JobStatus,
        /// Requested status
        to: JobStatus,
    },

    /// Server accepted a job without returning its identifier
    #[error("server did not return a request id")]
    MissingRequestId,
}

impl PipelineError {
    /// Retry classification
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Unsplittable { .. }
            | PipelineError::InvalidRange { .. }
            | PipelineError::InvalidTransition { .. }
            | PipelineError::MissingRequestId
            | PipelineError::Store(StoreError::UnknownFieldType(_))
            | PipelineError::Store(StoreError::Configuration(_)) => ErrorKind::Fatal,
            PipelineError::Api(_)
            | PipelineError::Store(_)
            | PipelineError::JobFailed { .. }
            | PipelineError::PollLimitExceeded { .. } => ErrorKind::Retryable,
        }
    }

    /// Shorthand for `kind() == ErrorKind::Retryable`
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Retryable
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Job polling configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay before every status check
    pub interval: Duration,
    /// Maximum status checks per job; `None` waits indefinitely
    pub max_polls: Option<u32>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(crate::config::DEFAULT_POLL_INTERVAL_SECS),
            max_polls: None,
        }
    }
}

/// Settings passed to the [`RunController`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    /// Attempt envelope
    pub retry: RetryPolicy,
    /// Job polling
    pub poll: PollSettings,
}
