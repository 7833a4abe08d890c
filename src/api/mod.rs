//! Export API access
//!
//! [`ExportApi`] is the seam the pipeline talks to; [`LogsApiClient`] is the
//! HTTP implementation. Every call is scoped by the counter and token carried
//! in the [`UserRequest`].

use crate::{DateRange, UserRequest};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod client;

pub use client::LogsApiClient;

/// Export API errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Non-200 response
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Http {
        /// Endpoint name
        endpoint: &'static str,
        /// Status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Request could not be sent or the body could not be read
    #[error("network error: {0}")]
    Network(String),

    /// Response body did not have the expected shape
    #[error("parse error: {0}")]
    Parse(String),
}

/// Result type for export API calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Server answer on whether a range can be exported in one job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimation {
    /// Whether the whole range fits in one job
    #[serde(rename = "possible")]
    pub feasible: bool,
    /// Largest day count that fits in one job
    #[serde(rename = "max_possible_day_quantity", default)]
    pub max_feasible_day_count: u64,
}

/// Status string reported by the server for a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RemoteStatus {
    /// Job accepted, not started
    Created,
    /// Job is being prepared (`awaiting_retry` and any unrecognized value land here too)
    Pending(String),
    /// Parts are ready for download
    Processed,
    /// Server gave up on the job (`processing_failed`, `canceled`)
    Failed(String),
    /// Generated parts were deleted
    Cleaned(String),
}

impl From<String> for RemoteStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "created" => RemoteStatus::Created,
            "processed" => RemoteStatus::Processed,
            "processing_failed" | "canceled" => RemoteStatus::Failed(s),
            "cleaned_by_user" | "cleaned_automatically_as_too_old" => RemoteStatus::Cleaned(s),
            _ => RemoteStatus::Pending(s),
        }
    }
}

impl From<&str> for RemoteStatus {
    fn from(s: &str) -> Self {
        RemoteStatus::from(s.to_string())
    }
}

impl From<RemoteStatus> for String {
    fn from(status: RemoteStatus) -> Self {
        status.as_str().to_string()
    }
}

impl RemoteStatus {
    /// Wire representation
    pub fn as_str(&self) -> &str {
        match self {
            RemoteStatus::Created => "created",
            RemoteStatus::Processed => "processed",
            RemoteStatus::Pending(s) | RemoteStatus::Failed(s) | RemoteStatus::Cleaned(s) => s,
        }
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One downloadable chunk of a processed job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartInfo {
    /// Zero-based part index
    pub part_number: u32,
    /// Size in bytes, when reported
    #[serde(default)]
    pub size: u64,
}

/// Job description returned by create, status and clean calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRequestInfo {
    /// Server-side job identifier
    #[serde(default)]
    pub request_id: Option<u64>,
    /// Current status
    pub status: RemoteStatus,
    /// Parts, present once processed
    #[serde(default)]
    pub parts: Vec<PartInfo>,
}

/// Remote export API operations used by the pipeline
#[async_trait]
pub trait ExportApi: Send + Sync {
    /// Ask whether `range` can be exported in one job
    async fn evaluate(&self, request: &UserRequest, range: &DateRange) -> ApiResult<Estimation>;

    /// Create a job for `range`
    async fn create(&self, request: &UserRequest, range: &DateRange)
        -> ApiResult<LogRequestInfo>;

    /// Fetch the current state of a job
    async fn status(&self, request: &UserRequest, request_id: u64) -> ApiResult<LogRequestInfo>;

    /// Download one part as tab-separated text
    async fn download(&self, request: &UserRequest, request_id: u64, part: u32)
        -> ApiResult<String>;

    /// Delete the generated parts of a job
    async fn clean(&self, request: &UserRequest, request_id: u64) -> ApiResult<LogRequestInfo>;

    /// Day the counter was created
    async fn counter_creation_date(&self, token: &str, counter_id: u64) -> ApiResult<NaiveDate>;
}

/// Fields joined for the evaluate call (configured order)
pub fn fields_param(fields: &[String]) -> String {
    fields.join(",")
}

/// Fields joined for the create call, sorted case-insensitively so equal
/// field sets always produce the same request
pub fn sorted_fields_param(fields: &[String]) -> String {
    let mut sorted: Vec<&String> = fields.iter().collect();
    sorted.sort_by_key(|f| f.to_lowercase());
    sorted
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",")
}
