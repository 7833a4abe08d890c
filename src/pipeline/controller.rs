//! Top-level run control: idempotency pre-check, retried pipeline, timing

use super::ingest::{Ingestor, PartReport};
use super::lifecycle::JobLifecycle;
use super::retry::retry_with_backoff;
use super::split::{split, split_range};
use super::{PipelineResult, RunSettings};
use crate::api::{Estimation, ExportApi};
use crate::fields::FieldMapper;
use crate::sleep::Sleeper;
use crate::store::{data_present, Store};
use crate::{DateRange, UserRequest};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Totals for one successful attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunSummary {
    /// Attempts made, including the successful one
    pub attempts: u32,
    /// Remote jobs completed
    pub jobs: usize,
    /// Parts downloaded
    pub parts: usize,
    /// Rows written to the store
    pub rows_loaded: usize,
    /// Rows dropped for a mismatched column count
    pub rows_dropped: usize,
    /// Wall time of the whole run
    pub elapsed: Duration,
}

impl RunSummary {
    fn add_part(&mut self, report: PartReport) {
        self.parts += 1;
        self.rows_loaded += report.rows_loaded;
        self.rows_dropped += report.rows_dropped;
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum RunOutcome {
    /// The store already had data for the range; nothing was done
    Skipped,
    /// The pipeline ran to completion
    Completed(RunSummary),
}

/// Runs the whole extraction and load for one [`UserRequest`]
pub struct RunController {
    settings: RunSettings,
    api: Arc<dyn ExportApi>,
    store: Arc<dyn Store>,
    sleeper: Arc<dyn Sleeper>,
    mapper: FieldMapper,
}

impl RunController {
    /// Create a controller with the default field mapper
    pub fn new(
        settings: RunSettings,
        api: Arc<dyn ExportApi>,
        store: Arc<dyn Store>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            settings,
            api,
            store,
            sleeper,
            mapper: FieldMapper::default(),
        }
    }

    /// Use a specific field mapper for header remapping
    pub fn with_mapper(mut self, mapper: FieldMapper) -> Self {
        self.mapper = mapper;
        self
    }

    /// Settings in use
    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Load the request unless the store already holds data for its range
    pub async fn run(&self, request: &UserRequest) -> PipelineResult<RunOutcome> {
        let started = Instant::now();

        if data_present(
            self.store.as_ref(),
            request.source,
            request.start_date(),
            request.end_date(),
        )
        .await?
        {
            warn!("Data for selected dates is already in database");
            return Ok(RunOutcome::Skipped);
        }

        let this = self;
        let mut summary = retry_with_backoff(
            &self.settings.retry,
            self.sleeper.as_ref(),
            move |attempt| this.run_attempt(request, attempt),
        )
        .await?;

        summary.elapsed = started.elapsed();
        let secs = summary.elapsed.as_secs();
        info!("### TOTAL TIME: {} minutes {} seconds", secs / 60, secs % 60);
        Ok(RunOutcome::Completed(summary))
    }

    /// Estimation and sub-ranges the next run would use, without creating jobs
    pub async fn plan(&self, request: &UserRequest) -> PipelineResult<(Estimation, Vec<DateRange>)> {
        let estimation = self.api.evaluate(request, &request.range).await?;
        let ranges = split_range(&request.range, &estimation)?;
        Ok((estimation, ranges))
    }

    /// One full split, lifecycle, ingest and cleanup pass
    async fn run_attempt(&self, request: &UserRequest, attempt: u32) -> PipelineResult<RunSummary> {
        info!("Attempt #{} for {} {}", attempt + 1, request.source, request.range);

        let estimation = self.api.evaluate(request, &request.range).await?;
        let mut jobs = split(request, &estimation)?;
        info!("Range {} split into {} job(s)", request.range, jobs.len());

        let lifecycle = JobLifecycle::new(self.api.clone(), self.sleeper.clone(), self.settings.poll);
        let ingestor = Ingestor::new(self.api.clone(), self.store.clone(), self.mapper.clone());

        let mut summary = RunSummary {
            attempts: attempt + 1,
            ..RunSummary::default()
        };

        for job in jobs.iter_mut() {
            lifecycle.create(job).await?;
            let parts = lifecycle.poll_until_processed(job).await?;

            info!("### SAVING DATA");
            for part in 0..parts {
                let report = ingestor.ingest_part(job, part).await?;
                summary.add_part(report);
            }
            job.mark_saved()?;

            lifecycle.cleanup(job).await?;
            summary.jobs += 1;
        }

        Ok(summary)
    }
}
