//! Quota-aware splitting of a request into job sub-ranges

use super::job::JobRequest;
use super::{PipelineError, PipelineResult};
use crate::api::Estimation;
use crate::{DateRange, UserRequest};
use chrono::Duration;

/// Sub-ranges for `range` given the server estimation
///
/// With `d = end - start` in days and `m` the feasible day count, the range is
/// cut into `d / m + 1` pieces of `d / (d / m + 1) + 1` days each. The last
/// piece is clamped to `end`; pieces that would start after `end` are not
/// produced. A range whose start is after its end is rejected.
pub fn split_range(range: &DateRange, estimation: &Estimation) -> PipelineResult<Vec<DateRange>> {
    if range.start > range.end {
        return Err(PipelineError::InvalidRange { range: *range });
    }
    if estimation.feasible {
        return Ok(vec![*range]);
    }

    let max_days = i64::try_from(estimation.max_feasible_day_count).unwrap_or(i64::MAX);
    if max_days == 0 {
        return Err(PipelineError::Unsplittable { range: *range });
    }

    let total_days = (range.end - range.start).num_days();
    let job_count = total_days / max_days + 1;
    let days_per_job = total_days / job_count + 1;

    let mut ranges = Vec::with_capacity(job_count as usize);
    for i in 0..job_count {
        let start = range.start + Duration::days(i * days_per_job);
        if start > range.end {
            break;
        }
        let end = (range.start + Duration::days((i + 1) * days_per_job - 1)).min(range.end);
        ranges.push(DateRange { start, end });
    }
    Ok(ranges)
}

/// Jobs for a request given the server estimation
pub fn split<'a>(
    request: &'a UserRequest,
    estimation: &Estimation,
) -> PipelineResult<Vec<JobRequest<'a>>> {
    Ok(split_range(&request.range, estimation)?
        .into_iter()
        .map(|range| JobRequest::new(request, range))
        .collect())
}
