//! Configuration file loading
//!
//! The loader reads a single JSON document. Unknown keys are ignored so the
//! same file can carry settings for other tools.

use crate::fields::FieldMapper;
use crate::pipeline::retry::RetryPolicy;
use crate::pipeline::{PollSettings, RunSettings};
use crate::store::schema::EnginePolicy;
use crate::Source;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default export API host
pub const DEFAULT_API_BASE_URL: &str = "https://api-metrika.yandex.ru";

/// Default number of pipeline attempts
pub const DEFAULT_RETRIES: u32 = 1;

/// Default base delay between attempts, in seconds
pub const DEFAULT_RETRIES_DELAY_SECS: u64 = 10;

/// Default delay between job status checks, in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Config path
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// File is not valid JSON or has wrong types
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Config path
        path: PathBuf,
        /// Underlying JSON error
        source: serde_json::Error,
    },

    /// Semantically invalid value
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// ClickHouse connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickHouseConfig {
    /// HTTP endpoint, e.g. `http://localhost:8123`
    pub host: String,
    /// Basic auth user (empty for none)
    #[serde(default)]
    pub user: String,
    /// Basic auth password (empty for none)
    #[serde(default)]
    pub password: String,
    /// Target database
    pub database: String,
    /// Table receiving visits
    #[serde(default = "default_visits_table")]
    pub visits_table: String,
    /// Table receiving hits
    #[serde(default = "default_hits_table")]
    pub hits_table: String,
}

fn default_visits_table() -> String {
    "visits_all".to_string()
}

fn default_hits_table() -> String {
    "hits_all".to_string()
}

impl ClickHouseConfig {
    /// Table name (without database) for a source
    pub fn table_for(&self, source: Source) -> &str {
        match source {
            Source::Hits => &self.hits_table,
            Source::Visits => &self.visits_table,
        }
    }
}

/// Per-source engine policy overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Policy for hits
    #[serde(default)]
    pub hits: Option<EnginePolicy>,
    /// Policy for visits
    #[serde(default)]
    pub visits: Option<EnginePolicy>,
}

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// OAuth token for the export API
    pub token: String,
    /// Counter (account) identifier
    pub counter_id: u64,
    /// Fields requested for visits
    #[serde(default)]
    pub visits_fields: Vec<String>,
    /// Fields requested for hits
    #[serde(default)]
    pub hits_fields: Vec<String>,
    /// Log level name (`DEBUG`, `INFO`, `WARNING`, ...)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Number of pipeline attempts
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Base delay between attempts, in seconds
    #[serde(default = "default_retries_delay")]
    pub retries_delay: u64,
    /// Delay between job status checks, in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
    /// Give up on a job after this many status checks (unbounded when absent)
    #[serde(default)]
    pub max_polls: Option<u32>,
    /// Export API host override
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Store connection
    pub clickhouse: ClickHouseConfig,
    /// Set to 1 to skip TLS certificate verification for the store
    #[serde(default)]
    pub disable_ssl_verification_for_clickhouse: u8,
    /// Column type for every external field identifier
    #[serde(default)]
    pub field_types: BTreeMap<String, String>,
    /// Engine selection overrides
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

fn default_retries_delay() -> u64 {
    DEFAULT_RETRIES_DELAY_SECS
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

impl AppConfig {
    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading config from {}", path.display());

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Source-independent checks
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::Invalid("token must not be empty".to_string()));
        }
        if self.retries == 0 {
            return Err(ConfigError::Invalid("retries must be at least 1".to_string()));
        }
        if self.poll_interval == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval must be at least 1 second".to_string(),
            ));
        }
        if self.clickhouse.host.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "clickhouse.host must not be empty".to_string(),
            ));
        }
        if self.clickhouse.database.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "clickhouse.database must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Checks that depend on the source being loaded
    pub fn validate_source(&self, source: Source) -> Result<(), ConfigError> {
        let fields = self.fields_for(source);
        if fields.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "{source}_fields must be specified in config"
            )));
        }

        let missing: Vec<&str> = fields
            .iter()
            .filter(|f| !self.field_types.contains_key(f.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "no column type configured for: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    /// Configured fields for a source
    pub fn fields_for(&self, source: Source) -> &[String] {
        match source {
            Source::Hits => &self.hits_fields,
            Source::Visits => &self.visits_fields,
        }
    }

    /// Export API host
    pub fn api_base_url(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL)
    }

    /// Whether the store's TLS certificate is verified
    pub fn verify_tls(&self) -> bool {
        self.disable_ssl_verification_for_clickhouse == 0
    }

    /// Engine policy for a source, falling back to the built-in identifiers
    pub fn engine_policy(&self, source: Source) -> EnginePolicy {
        let configured = match source {
            Source::Hits => self.engine.hits.clone(),
            Source::Visits => self.engine.visits.clone(),
        };
        configured.unwrap_or_else(|| EnginePolicy::default_for(source))
    }

    /// Field mapper carrying the configured column types
    pub fn field_mapper(&self) -> FieldMapper {
        FieldMapper::new(self.field_types.clone())
    }

    /// Pipeline settings derived from this config
    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            retry: RetryPolicy::new(self.retries, Duration::from_secs(self.retries_delay)),
            poll: PollSettings {
                interval: Duration::from_secs(self.poll_interval),
                max_polls: self.max_polls,
            },
        }
    }
}
