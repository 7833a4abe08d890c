//! Part download, row validation and store load

use super::job::JobRequest;
use super::PipelineResult;
use crate::api::ExportApi;
use crate::fields::FieldMapper;
use crate::metrics::record_part;
use crate::store::{ensure_schema, Store};
use std::sync::Arc;
use tracing::{debug, info, warn};

const TAB: char = '\t';
const NEW_LINE: &str = "\n";

/// Rows shown in the per-part data sample
const SAMPLE_ROWS: usize = 5;

/// A downloaded part split into header and rows with the expected column count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPart<'a> {
    /// Header line as received
    pub header: &'a str,
    /// Rows whose column count matches the header
    pub rows: Vec<&'a str>,
    /// Rows dropped for a mismatched column count
    pub dropped: usize,
}

/// Split a part body into header and valid rows
///
/// Blank lines are ignored. Returns `None` for a body without any line.
pub fn parse_part(body: &str) -> Option<ParsedPart<'_>> {
    let mut lines = body
        .split(NEW_LINE)
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty());
    let header = lines.next()?;
    let header_tabs = header.matches(TAB).count();

    let mut rows = Vec::new();
    let mut dropped = 0;
    for line in lines {
        if line.matches(TAB).count() == header_tabs {
            rows.push(line);
        } else {
            dropped += 1;
        }
    }

    Some(ParsedPart {
        header,
        rows,
        dropped,
    })
}

/// Build the store payload: remapped header followed by the rows, with
/// escaped single quotes (`\'`) turned into plain quotes
pub fn build_payload(part: &ParsedPart<'_>, mapper: &FieldMapper) -> String {
    let mut payload = mapper.map_header(part.header);
    for row in &part.rows {
        payload.push_str(NEW_LINE);
        payload.push_str(row);
    }
    payload.replace("\\'", "'")
}

/// Outcome of ingesting one part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartReport {
    /// Rows written to the store
    pub rows_loaded: usize,
    /// Rows dropped for a mismatched column count
    pub rows_dropped: usize,
}

/// Downloads parts and writes them to the store
pub struct Ingestor {
    api: Arc<dyn ExportApi>,
    store: Arc<dyn Store>,
    mapper: FieldMapper,
}

impl Ingestor {
    /// Create an ingestor
    pub fn new(api: Arc<dyn ExportApi>, store: Arc<dyn Store>, mapper: FieldMapper) -> Self {
        Self { api, store, mapper }
    }

    /// Download part `part` of a processed job and load its valid rows
    pub async fn ingest_part(&self, job: &JobRequest<'_>, part: u32) -> PipelineResult<PartReport> {
        let request = job.request();
        let request_id = job.require_remote_id()?;
        info!("Part #{}", part);

        let body = self.api.download(request, request_id, part).await?;
        let Some(parsed) = parse_part(&body) else {
            warn!("### No data to upload");
            return Ok(PartReport::default());
        };

        debug!(
            "### DATA SAMPLE\n{}",
            std::iter::once(parsed.header)
                .chain(parsed.rows.iter().copied().take(SAMPLE_ROWS))
                .collect::<Vec<_>>()
                .join(NEW_LINE)
        );

        if parsed.dropped != 0 {
            warn!("{} rows were filtered out", parsed.dropped);
        }

        let report = PartReport {
            rows_loaded: parsed.rows.len(),
            rows_dropped: parsed.dropped,
        };

        if parsed.rows.is_empty() {
            warn!("### No data to upload");
        } else {
            let payload = build_payload(&parsed, &self.mapper);
            ensure_schema(self.store.as_ref(), request.source, &request.fields).await?;
            self.store.load(request.source, &payload).await?;
        }

        record_part(request.source.as_str(), report.rows_loaded, report.rows_dropped);
        Ok(report)
    }
}
