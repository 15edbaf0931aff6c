//! Metrics and observability utilities
//!
//! Emits through the `metrics` facade only; hosts decide which recorder
//! to install.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all wikinow metrics
pub const METRICS_PREFIX: &str = "wikinow";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_linkgraph_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total link-graph API page fetches"
    );

    describe_histogram!(
        format!("{}_linkgraph_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Link-graph page fetch latency in seconds"
    );

    describe_counter!(
        format!("{}_related_resolutions_total", METRICS_PREFIX),
        Unit::Count,
        "Total related-topic resolutions"
    );

    describe_counter!(
        format!("{}_pageview_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total pageview series fetches"
    );

    describe_histogram!(
        format!("{}_pageview_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Pageview series fetch latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Helper to time a remote fetch
pub struct FetchTimer {
    start: Instant,
}

impl FetchTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Helper to record a link-graph page fetch
pub fn record_linkgraph_fetch(duration_secs: f64, direction: &str, titles: usize) {
    counter!(
        format!("{}_linkgraph_requests_total", METRICS_PREFIX),
        "direction" => direction.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_linkgraph_request_duration_seconds", METRICS_PREFIX),
        "direction" => direction.to_string()
    )
    .record(duration_secs);

    metrics::gauge!(
        format!("{}_linkgraph_batch_size", METRICS_PREFIX),
        "direction" => direction.to_string()
    )
    .set(titles as f64);
}

/// Helper to record a completed resolution
pub fn record_resolution(method: &str, result_count: usize) {
    counter!(
        format!("{}_related_resolutions_total", METRICS_PREFIX),
        "method" => method.to_string(),
        "results" => result_count.to_string()
    )
    .increment(1);
}

/// Helper to record a pageview series fetch
pub fn record_pageview_fetch(duration_secs: f64, source: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_pageview_requests_total", METRICS_PREFIX),
        "source" => source.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_pageview_request_duration_seconds", METRICS_PREFIX),
            "source" => source.to_string()
        )
        .record(duration_secs);
    }
}
