//! CLI error types and conversions

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::pipeline::PipelineError;
use crate::store::StoreError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Config file error
    #[error("config error: {0}")]
    ConfigError(#[from] ConfigError),

    /// Pipeline error
    #[error("pipeline error: {0}")]
    PipelineError(#[from] PipelineError),

    /// Export API error outside the pipeline (e.g. date period lookup)
    #[error("API error: {0}")]
    ApiError(#[from] ApiError),

    /// Store setup error
    #[error("store error: {0}")]
    StoreError(#[from] StoreError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}
