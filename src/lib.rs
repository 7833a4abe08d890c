//! # Logs API Loader Library
//!
//! Extracts raw analytics logs from an asynchronous, quota-limited export API
//! and loads them into ClickHouse.
//!
//! ## Features
//!
//! - **Quota-aware splitting**: ranges the server refuses in one piece are
//!   split into feasible sub-ranges
//! - **Job lifecycle**: create, poll until processed, download parts, clean
//! - **Defensive parsing**: malformed rows are filtered and reported
//! - **Idempotent loads**: ranges already present in the store are skipped
//! - **Retry envelope**: the whole run is retried with linear backoff
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use logs_api_loader::api::LogsApiClient;
//! use logs_api_loader::config::AppConfig;
//! use logs_api_loader::pipeline::RunController;
//! use logs_api_loader::sleep::TokioSleeper;
//! use logs_api_loader::store::ClickHouseStore;
//! use logs_api_loader::{Source, UserRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load("config.json")?;
//! let request = UserRequest::new(
//!     config.token.clone(),
//!     config.counter_id,
//!     "2020-01-01".parse()?,
//!     "2020-01-10".parse()?,
//!     Source::Visits,
//!     config.fields_for(Source::Visits).to_vec(),
//! )?;
//!
//! let api = Arc::new(LogsApiClient::new(config.api_base_url()));
//! let store = Arc::new(ClickHouseStore::from_config(&config)?);
//! let controller = RunController::new(config.run_settings(), api, store, Arc::new(TokioSleeper));
//! controller.run(&request).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`api`] - Export API client and response types
//! - [`store`] - Store adapter (ClickHouse over HTTP) and schema generation
//! - [`fields`] - External field name to column name mapping
//! - [`pipeline`] - Splitting, job lifecycle, ingestion, retry and run control
//! - [`config`] - JSON configuration file
//! - [`cli`] - Command line interface

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Export API client
pub mod api;

/// CLI command implementations
pub mod cli;

/// Configuration file loading
pub mod config;

/// Field name mapping
pub mod fields;

/// Observability counters
pub mod metrics;

/// Extraction and load pipeline
pub mod pipeline;

/// Injectable sleeping
pub mod sleep;

/// Store adapter
pub mod store;

/// Date format used by the export API and the store
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Category of analytics data requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Page views
    Hits,
    /// Sessions
    Visits,
}

impl Source {
    /// Name used by the export API
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Hits => "hits",
            Source::Visits => "visits",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hits" => Ok(Source::Hits),
            "visits" => Ok(Source::Visits),
            _ => Err(format!("Invalid source: {s}. Valid options: hits, visits")),
        }
    }
}

/// Inclusive range of calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day of the range
    pub start: NaiveDate,
    /// Last day of the range (inclusive)
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, String> {
        if start > end {
            return Err(format!(
                "Start date ({start}) must not be after end date ({end})"
            ));
        }
        Ok(Self { start, end })
    }

    /// Number of calendar days covered, counting both ends
    pub fn day_count(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Whether `other` lies entirely within this range
    pub fn contains(&self, other: &DateRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

/// Immutable description of what one invocation should load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRequest {
    /// OAuth token for the export API
    pub token: String,
    /// Counter (account) identifier
    pub counter_id: u64,
    /// Requested range
    pub range: DateRange,
    /// Data category
    pub source: Source,
    /// External field identifiers, in configured order
    pub fields: Vec<String>,
}

impl UserRequest {
    /// Build and validate a request
    pub fn new(
        token: String,
        counter_id: u64,
        start_date: NaiveDate,
        end_date: NaiveDate,
        source: Source,
        fields: Vec<String>,
    ) -> Result<Self, String> {
        let range = DateRange::new(start_date, end_date)?;
        let request = Self {
            token,
            counter_id,
            range,
            source,
            fields,
        };
        request.validate()?;
        Ok(request)
    }

    /// Validate request parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.token.trim().is_empty() {
            return Err("Token cannot be empty".to_string());
        }

        if self.fields.is_empty() {
            return Err(format!("No fields configured for source {}", self.source));
        }

        if let Some(field) = self.fields.iter().find(|f| f.trim().is_empty()) {
            return Err(format!("Field identifier cannot be blank: {field:?}"));
        }

        if self.range.start > self.range.end {
            return Err(format!("Invalid date range: {}", self.range));
        }

        Ok(())
    }

    /// First requested day
    pub fn start_date(&self) -> NaiveDate {
        self.range.start
    }

    /// Last requested day
    pub fn end_date(&self) -> NaiveDate {
        self.range.end
    }
}
