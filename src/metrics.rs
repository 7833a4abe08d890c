//! Observability counters for the load pipeline
//!
//! Counters are recorded unconditionally through the `metrics` facade. They
//! are only exported when [`init_metrics`] installs the Prometheus recorder;
//! otherwise recording is a no-op.

use metrics::{counter, describe_counter, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Install the Prometheus exporter on `addr`
///
/// Idempotent: later calls are ignored. Must run inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "logs_api_requests_total",
        Unit::Count,
        "Export API requests by endpoint and HTTP status"
    );
    describe_counter!(
        "job_polls_total",
        Unit::Count,
        "Job status checks"
    );
    describe_counter!(
        "rows_loaded_total",
        Unit::Count,
        "Rows written to the store"
    );
    describe_counter!(
        "rows_dropped_total",
        Unit::Count,
        "Rows dropped because their column count did not match the header"
    );
    describe_counter!(
        "pipeline_attempts_total",
        Unit::Count,
        "Pipeline attempts by outcome"
    );

    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

/// Count one export API response
pub fn record_api_request(endpoint: &'static str, status: u16) {
    counter!(
        "logs_api_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string(),
    )
    .increment(1);
}

/// Count one job status check
pub fn record_poll() {
    counter!("job_polls_total").increment(1);
}

/// Count rows loaded and dropped for one part
pub fn record_part(source: &'static str, loaded: usize, dropped: usize) {
    counter!("rows_loaded_total", "source" => source).increment(loaded as u64);
    counter!("rows_dropped_total", "source" => source).increment(dropped as u64);
}

/// Count one pipeline attempt (`outcome` is `success`, `retry` or `failed`)
pub fn record_attempt(outcome: &'static str) {
    counter!("pipeline_attempts_total", "outcome" => outcome).increment(1);
}
