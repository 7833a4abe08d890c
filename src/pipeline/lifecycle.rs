//! Remote job lifecycle: create, poll until processed, clean

use super::job::JobRequest;
use super::{PipelineError, PipelineResult, PollSettings};
use crate::api::{ApiError, ExportApi, PartInfo, RemoteStatus};
use crate::metrics::record_poll;
use crate::sleep::Sleeper;
use std::sync::Arc;
use tracing::{debug, info};

/// Drives jobs through their server-side states
pub struct JobLifecycle {
    api: Arc<dyn ExportApi>,
    sleeper: Arc<dyn Sleeper>,
    poll: PollSettings,
}

impl JobLifecycle {
    /// Create a lifecycle manager
    pub fn new(api: Arc<dyn ExportApi>, sleeper: Arc<dyn Sleeper>, poll: PollSettings) -> Self {
        Self { api, sleeper, poll }
    }

    /// Submit the job to the server
    pub async fn create(&self, job: &mut JobRequest<'_>) -> PipelineResult<()> {
        info!("### CREATING TASK for {}", job.range());
        let response = self.api.create(job.request(), job.range()).await?;
        let request_id = response.request_id.ok_or(PipelineError::MissingRequestId)?;
        job.mark_created(request_id)?;
        debug!(request_id, status = %response.status, "Job created");

        // Parts are only taken from a status check, so any non-terminal
        // status here leaves the job in `Created`
        match response.status {
            RemoteStatus::Failed(_) | RemoteStatus::Cleaned(_) => {
                apply_status(job, request_id, &response.status, &response.parts)
            }
            _ => Ok(()),
        }
    }

    /// Sleep and check status until the server reports `processed`
    ///
    /// At least one status check is always made.
    pub async fn poll_until_processed(&self, job: &mut JobRequest<'_>) -> PipelineResult<u32> {
        let request_id = job.require_remote_id()?;
        let mut polls: u32 = 0;

        loop {
            if let Some(limit) = self.poll.max_polls {
                if polls >= limit {
                    return Err(PipelineError::PollLimitExceeded { request_id, polls });
                }
            }

            info!("### DELAY {} secs", self.poll.interval.as_secs());
            self.sleeper.sleep(self.poll.interval).await;

            info!("### CHECKING STATUS");
            let response = self.api.status(job.request(), request_id).await?;
            polls += 1;
            record_poll();
            info!("API Request status: {}", response.status);

            apply_status(job, request_id, &response.status, &response.parts)?;
            if let Some(parts) = job.part_count() {
                info!(request_id, parts, "Job processed");
                return Ok(parts);
            }
        }
    }

    /// Delete the job's generated parts on the server
    pub async fn cleanup(&self, job: &mut JobRequest<'_>) -> PipelineResult<()> {
        let request_id = job.require_remote_id()?;
        info!("### CLEANING DATA");
        let response = self.api.clean(job.request(), request_id).await?;
        debug!(request_id, status = %response.status, "Job cleaned");
        match response.status {
            RemoteStatus::Cleaned(_) => job.mark_cleaned(),
            other => Err(PipelineError::JobFailed {
                request_id,
                status: other.to_string(),
            }),
        }
    }
}

/// Advance the job according to a server-reported status
fn apply_status(
    job: &mut JobRequest<'_>,
    request_id: u64,
    status: &RemoteStatus,
    parts: &[PartInfo],
) -> PipelineResult<()> {
    match status {
        // Still waiting; a fresh job stays in `Created` until the first check
        RemoteStatus::Created if job.status() == super::JobStatus::Created => Ok(()),
        RemoteStatus::Created | RemoteStatus::Pending(_) => job.mark_processing(),
        RemoteStatus::Processed => {
            let part_count = u32::try_from(parts.len()).map_err(|_| {
                ApiError::Parse(format!("job {request_id} reports {} parts", parts.len()))
            })?;
            job.mark_processed(part_count)
        }
        RemoteStatus::Failed(reported) => {
            job.mark_failed()?;
            Err(PipelineError::JobFailed {
                request_id,
                status: reported.clone(),
            })
        }
        RemoteStatus::Cleaned(reported) => Err(PipelineError::JobFailed {
            request_id,
            status: reported.clone(),
        }),
    }
}
