//! Load command implementation

use super::{Cli, CliError, OutputFormat, PeriodArgs};
use crate::api::LogsApiClient;
use crate::config::AppConfig;
use crate::metrics::init_metrics;
use crate::pipeline::{RetryPolicy, RunController, RunOutcome};
use crate::sleep::TokioSleeper;
use crate::store::ClickHouseStore;
use crate::UserRequest;
use clap::Args;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Arguments for the load command
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Source and date period
    #[command(flatten)]
    pub period: PeriodArgs,

    /// Number of pipeline attempts; overrides the config file
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub retries: Option<u32>,

    /// Base delay between attempts in seconds; overrides the config file
    #[arg(long)]
    pub retries_delay: Option<u64>,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}

impl LoadArgs {
    /// Retry policy after command line overrides
    pub fn retry_policy(&self, config: &AppConfig) -> RetryPolicy {
        let base = config.run_settings().retry;
        RetryPolicy::new(
            self.retries.unwrap_or(base.max_attempts),
            self.retries_delay
                .map(Duration::from_secs)
                .unwrap_or(base.base_delay),
        )
    }

    /// Execute the load command
    pub async fn execute(&self, cli: &Cli, config: &AppConfig) -> Result<(), CliError> {
        if let Some(addr) = self.metrics_addr {
            init_metrics(addr).map_err(CliError::ConfigurationError)?;
        }

        let api = Arc::new(LogsApiClient::new(config.api_base_url()));
        let request = self.period.user_request(api.as_ref(), config).await?;
        let store = Arc::new(ClickHouseStore::from_config(config)?);

        let mut settings = config.run_settings();
        settings.retry = self.retry_policy(config);
        info!(
            attempts = settings.retry.max_attempts,
            delay_secs = settings.retry.base_delay.as_secs(),
            poll_secs = settings.poll.interval.as_secs(),
            "Starting load"
        );

        let controller = RunController::new(settings, api, store, Arc::new(TokioSleeper))
            .with_mapper(config.field_mapper());
        let outcome = controller.run(&request).await?;

        match cli.output_format {
            OutputFormat::Json => output_json(&request, &outcome),
            OutputFormat::Human => output_human(&request, &outcome),
        }
        Ok(())
    }
}

fn output_json(request: &UserRequest, outcome: &RunOutcome) {
    let output = serde_json::json!({
        "counter_id": request.counter_id,
        "source": request.source,
        "start_date": request.range.start,
        "end_date": request.range.end,
        "result": outcome,
    });
    println!("{output}");
}

fn output_human(request: &UserRequest, outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Skipped => {
            println!(
                "Skipped: {} data for {} is already in the database",
                request.source, request.range
            );
        }
        RunOutcome::Completed(summary) => {
            println!("\nLoad completed successfully!");
            println!("Source: {}", request.source);
            println!("Period: {}", request.range);
            println!("Jobs: {}", summary.jobs);
            println!("Parts: {}", summary.parts);
            println!("Rows loaded: {}", summary.rows_loaded);
            if summary.rows_dropped > 0 {
                println!("Rows dropped: {}", summary.rows_dropped);
            }
            if summary.attempts > 1 {
                println!("Attempts: {}", summary.attempts);
            }
            let secs = summary.elapsed.as_secs();
            println!("Total time: {} minutes {} seconds", secs / 60, secs % 60);
        }
    }
}
