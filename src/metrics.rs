//! Prometheus Metrics
//!
//! Metrics include:
//! - feed fetch latency and outcome
//! - decoded and dropped feed records
//! - reconciliation calls per action and outcome

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramOpts, HistogramVec,
    IntCounterVec, TextEncoder,
};
use tracing::error;

/// Reconciliation actions
pub const ACTION_SUBSCRIBE: &str = "subscribe";
pub const ACTION_UNSUBSCRIBE: &str = "unsubscribe";

// Feed fetches by source and status
static FEED_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "bubbla_feed_fetches_total",
        "Total number of feed fetches",
        &["source", "status"]
    )
    .expect("Failed to create feed_fetches metric")
});

// Fetch + decode latency (in seconds)
static FEED_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];
    register_histogram_vec!(
        HistogramOpts::new(
            "bubbla_feed_latency_seconds",
            "Latency of fetching and decoding the feed"
        )
        .buckets(buckets),
        &["source"]
    )
    .expect("Failed to create feed_latency metric")
});

// Feed records by outcome
static FEED_RECORDS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "bubbla_feed_records_total",
        "Feed records decoded or dropped",
        &["source", "outcome"]
    )
    .expect("Failed to create feed_records metric")
});

// Remote subscription calls
static RECONCILE_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "bubbla_reconcile_calls_total",
        "Subscribe and unsubscribe calls issued during reconciliation",
        &["action", "status"]
    )
    .expect("Failed to create reconcile_calls metric")
});

pub fn record_feed_fetch(source: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    FEED_FETCHES.with_label_values(&[source, status]).inc();
}

pub fn record_feed_latency(source: &str, latency_secs: f64) {
    FEED_LATENCY.with_label_values(&[source]).observe(latency_secs);
}

pub fn record_feed_records(source: &str, decoded: u64, dropped: u64) {
    FEED_RECORDS
        .with_label_values(&[source, "decoded"])
        .inc_by(decoded);
    FEED_RECORDS
        .with_label_values(&[source, "dropped"])
        .inc_by(dropped);
}

pub fn record_reconcile_call(action: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    RECONCILE_CALLS.with_label_values(&[action, status]).inc();
}

/// Collects all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_default()
}

/// Observes feed latency for `source` when dropped
pub struct FeedTimer {
    source: &'static str,
    start: std::time::Instant,
}

impl FeedTimer {
    pub fn new(source: &'static str) -> Self {
        Self {
            source,
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for FeedTimer {
    fn drop(&mut self) {
        record_feed_latency(self.source, self.start.elapsed().as_secs_f64());
    }
}
