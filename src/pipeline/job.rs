//! Job request and its status state machine

use super::{PipelineError, PipelineResult};
use crate::{DateRange, UserRequest};
use serde::{Deserialize, Serialize};

/// Local lifecycle status of one remote job
///
/// Edges: `New -> Created -> Processing* -> Processed -> Saved -> Cleaned`,
/// `Created | Processing -> Processed`, `Created | Processing -> Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum JobStatus {
    /// Not yet submitted
    #[default]
    New,
    /// Accepted by the server
    Created,
    /// Being prepared on the server
    Processing,
    /// Parts ready for download
    Processed,
    /// All parts loaded into the store
    Saved,
    /// Server-side parts deleted
    Cleaned,
    /// Server gave up on the job
    Failed,
}

impl JobStatus {
    /// Whether `self -> next` is a valid edge
    pub fn can_advance_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (New, Created)
                | (Created, Processing)
                | (Created, Processed)
                | (Created, Failed)
                | (Processing, Processing)
                | (Processing, Processed)
                | (Processing, Failed)
                | (Processed, Saved)
                | (Saved, Cleaned)
        )
    }
}

/// One remote job covering a sub-range of a [`UserRequest`]
#[derive(Debug, Clone)]
pub struct JobRequest<'a> {
    request: &'a UserRequest,
    range: DateRange,
    status: JobStatus,
    remote_id: Option<u64>,
    part_count: Option<u32>,
}

impl<'a> JobRequest<'a> {
    /// New job for `range`, which must lie within the request's range
    pub fn new(request: &'a UserRequest, range: DateRange) -> Self {
        debug_assert!(request.range.contains(&range));
        Self {
            request,
            range,
            status: JobStatus::New,
            remote_id: None,
            part_count: None,
        }
    }

    /// Parent request
    pub fn request(&self) -> &'a UserRequest {
        self.request
    }

    /// Sub-range covered by this job
    pub fn range(&self) -> &DateRange {
        &self.range
    }

    /// Current status
    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Server-side identifier, once created
    pub fn remote_id(&self) -> Option<u64> {
        self.remote_id
    }

    /// Server-side identifier, failing if the job was never created
    pub fn require_remote_id(&self) -> PipelineResult<u64> {
        self.remote_id.ok_or(PipelineError::MissingRequestId)
    }

    /// Number of parts, once processed
    pub fn part_count(&self) -> Option<u32> {
        self.part_count
    }

    fn advance(&mut self, next: JobStatus) -> PipelineResult<()> {
        if !self.status.can_advance_to(next) {
            return Err(PipelineError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Record server acceptance
    pub fn mark_created(&mut self, remote_id: u64) -> PipelineResult<()> {
        self.advance(JobStatus::Created)?;
        self.remote_id = Some(remote_id);
        Ok(())
    }

    /// Record that the server is still preparing the job
    pub fn mark_processing(&mut self) -> PipelineResult<()> {
        self.advance(JobStatus::Processing)
    }

    /// Record that `part_count` parts are ready
    pub fn mark_processed(&mut self, part_count: u32) -> PipelineResult<()> {
        self.advance(JobStatus::Processed)?;
        self.part_count = Some(part_count);
        Ok(())
    }

    /// Record that every part was ingested
    pub fn mark_saved(&mut self) -> PipelineResult<()> {
        self.advance(JobStatus::Saved)
    }

    /// Record server-side cleanup
    pub fn mark_cleaned(&mut self) -> PipelineResult<()> {
        self.advance(JobStatus::Cleaned)
    }

    /// Record a server-side failure
    pub fn mark_failed(&mut self) -> PipelineResult<()> {
        self.advance(JobStatus::Failed)
    }
}
