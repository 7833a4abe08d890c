//! Plan command: evaluate a period and print the job split

use super::{Cli, CliError, OutputFormat, PeriodArgs};
use crate::api::LogsApiClient;
use crate::config::AppConfig;
use crate::pipeline::RunController;
use crate::sleep::TokioSleeper;
use crate::store::ClickHouseStore;
use clap::Args;
use std::sync::Arc;

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Source and date period
    #[command(flatten)]
    pub period: PeriodArgs,
}

impl PlanArgs {
    /// Execute the plan command
    pub async fn execute(&self, cli: &Cli, config: &AppConfig) -> Result<(), CliError> {
        let api = Arc::new(LogsApiClient::new(config.api_base_url()));
        let request = self.period.user_request(api.as_ref(), config).await?;
        let store = Arc::new(ClickHouseStore::from_config(config)?);

        let controller =
            RunController::new(config.run_settings(), api, store, Arc::new(TokioSleeper));
        let (estimation, ranges) = controller.plan(&request).await?;

        match cli.output_format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "source": request.source,
                    "estimation": estimation,
                    "jobs": ranges,
                });
                println!("{output}");
            }
            OutputFormat::Human => {
                println!("Source: {}", request.source);
                println!("Period: {} ({} days)", request.range, request.range.day_count());
                println!(
                    "Feasible in one job: {}",
                    if estimation.feasible { "yes" } else { "no" }
                );
                println!("Max days per job: {}", estimation.max_feasible_day_count);
                println!("Jobs: {}", ranges.len());
                for (i, range) in ranges.iter().enumerate() {
                    println!("  #{}: {} ({} days)", i + 1, range, range.day_count());
                }
            }
        }
        Ok(())
    }
}
