//! Request metrics.
//!
//! # Metrics
//! - `pecan_requests_total` (counter): completed requests by method, status
//! - `pecan_request_duration_seconds` (histogram): dispatch latency by method
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   every call is a no-op
//! - The library never installs an exporter; the host decides

use std::time::Duration;

pub const REQUESTS_TOTAL: &str = "pecan_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "pecan_request_duration_seconds";

/// Record one completed request.
pub fn record_request(method: &str, status: u16, elapsed: Duration) {
    metrics::counter!(
        REQUESTS_TOTAL,
        "method" => method.to_owned(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(REQUEST_DURATION_SECONDS, "method" => method.to_owned())
        .record(elapsed.as_secs_f64());
}
