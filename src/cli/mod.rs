//! CLI command implementations

pub mod error;
pub mod load;
pub mod period;
pub mod plan;

pub use error::CliError;
pub use load::LoadArgs;
pub use period::{Mode, PeriodArgs};
pub use plan::PlanArgs;

use crate::config::AppConfig;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Logs API Loader CLI
#[derive(Parser, Debug)]
#[command(name = "logs-api-loader")]
#[command(about = "Load raw analytics logs from the Logs API into ClickHouse", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the JSON config file
    #[arg(long, global = true, default_value = "config.json")]
    pub config: PathBuf,

    /// Log level (DEBUG, INFO, WARNING, ERROR); overrides the config file
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format (json or human)
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export a date range and load it into the store
    Load(LoadArgs),

    /// Show how a date range would be split into jobs, without creating any
    Plan(PlanArgs),
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl Cli {
    /// Load and validate the config file named on the command line
    pub fn load_config(&self) -> Result<AppConfig, CliError> {
        Ok(AppConfig::load(&self.config)?)
    }

    /// Effective log level: command line first, then config
    pub fn log_level<'a>(&'a self, config: Option<&'a AppConfig>) -> &'a str {
        self.log_level
            .as_deref()
            .or(config.map(|c| c.log_level.as_str()))
            .unwrap_or("INFO")
    }

    /// Execute the selected command
    pub async fn execute(&self, config: &AppConfig) -> Result<(), CliError> {
        match &self.command {
            Commands::Load(args) => args.execute(self, config).await,
            Commands::Plan(args) => args.execute(self, config).await,
        }
    }
}

/// Map a log level name to an `EnvFilter` directive for this crate
///
/// Accepts the level names used in config files (`CRITICAL`, `WARNING`, ...)
/// as well as tracing's own names. Unknown names fall back to `info`.
pub fn log_directive(level: &str) -> String {
    let level = match level.trim().to_uppercase().as_str() {
        "CRITICAL" | "FATAL" | "ERROR" => "error",
        "WARNING" | "WARN" => "warn",
        "DEBUG" => "debug",
        "TRACE" => "trace",
        _ => "info",
    };
    format!("logs_api_loader={level}")
}
