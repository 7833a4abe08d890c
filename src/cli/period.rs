//! Date period selection shared by the load and plan commands

use super::CliError;
use crate::api::ExportApi;
use crate::config::AppConfig;
use crate::{DateRange, Source, UserRequest};
use chrono::{Duration, Local, NaiveDate};
use clap::{Args, ValueEnum};
use tracing::info;

/// Named date periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// The day before yesterday
    Regular,
    /// Yesterday
    #[value(name = "regular_early")]
    RegularEarly,
    /// From the counter's creation date to the day before yesterday
    History,
}

impl Mode {
    /// Range for this mode; `History` needs the counter creation date
    pub fn range(
        self,
        today: NaiveDate,
        counter_created: Option<NaiveDate>,
    ) -> Result<DateRange, CliError> {
        let day_before_yesterday = today - Duration::days(2);
        match self {
            Mode::Regular => DateRange::new(day_before_yesterday, day_before_yesterday)
                .map_err(CliError::InvalidArgument),
            Mode::RegularEarly => {
                let yesterday = today - Duration::days(1);
                DateRange::new(yesterday, yesterday).map_err(CliError::InvalidArgument)
            }
            Mode::History => {
                let created = counter_created.ok_or_else(|| {
                    CliError::InvalidArgument(
                        "history mode needs the counter creation date".to_string(),
                    )
                })?;
                DateRange::new(created, day_before_yesterday).map_err(CliError::InvalidArgument)
            }
        }
    }
}

/// Source and date period arguments
#[derive(Args, Debug, Clone)]
pub struct PeriodArgs {
    /// Data source to load
    #[arg(long, value_enum)]
    pub source: Source,

    /// First day to load (YYYY-MM-DD)
    #[arg(long, requires = "end_date", conflicts_with = "mode")]
    pub start_date: Option<NaiveDate>,

    /// Last day to load, inclusive (YYYY-MM-DD)
    #[arg(long, requires = "start_date", conflicts_with = "mode")]
    pub end_date: Option<NaiveDate>,

    /// Named period instead of explicit dates
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,
}

impl PeriodArgs {
    /// Resolve the requested range relative to `today`
    pub async fn resolve(
        &self,
        today: NaiveDate,
        api: &dyn ExportApi,
        config: &AppConfig,
    ) -> Result<DateRange, CliError> {
        match (self.mode, self.start_date, self.end_date) {
            (Some(Mode::History), _, _) => {
                let created = api
                    .counter_creation_date(&config.token, config.counter_id)
                    .await?;
                info!("Counter {} created on {}", config.counter_id, created);
                Mode::History.range(today, Some(created))
            }
            (Some(mode), _, _) => mode.range(today, None),
            (None, Some(start), Some(end)) => {
                DateRange::new(start, end).map_err(CliError::InvalidArgument)
            }
            _ => Err(CliError::InvalidArgument(
                "either --start-date and --end-date or --mode must be given".to_string(),
            )),
        }
    }

    /// Build the validated request for this period
    pub async fn user_request(
        &self,
        api: &dyn ExportApi,
        config: &AppConfig,
    ) -> Result<UserRequest, CliError> {
        config.validate_source(self.source)?;
        let today = Local::now().date_naive();
        let range = self.resolve(today, api, config).await?;

        let request = UserRequest::new(
            config.token.clone(),
            config.counter_id,
            range.start,
            range.end,
            self.source,
            config.fields_for(self.source).to_vec(),
        )
        .map_err(CliError::InvalidArgument)?;

        info!(
            counter_id = request.counter_id,
            source = %request.source,
            range = %request.range,
            fields = request.fields.len(),
            "User request"
        );
        Ok(request)
    }
}
