//! Telemetry for the console
//!
//! Prometheus counters for handshakes, dispatches and mirror installs,
//! exposed in text format by `GET /metrics`.

use crate::{ConsoleError, Result};
use once_cell::sync::Lazy;
use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, TextEncoder, register_counter_vec,
    register_histogram_vec,
};

/// Handshake steps by provider, step and outcome
static AUTHORIZATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "console_authorizations_total",
        "Authorization handshake steps",
        &["provider", "step", "outcome"]
    )
    .unwrap()
});

/// Dispatched API calls by provider and outcome
static DISPATCHES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "console_dispatches_total",
        "API calls dispatched through provider connections",
        &["provider", "outcome"]
    )
    .unwrap()
});

/// Upstream latency of dispatched calls
static DISPATCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        HistogramOpts::new(
            "console_dispatch_duration_seconds",
            "Duration of dispatched API calls in seconds"
        ),
        &["provider"]
    )
    .unwrap()
});

/// Mirror outcomes per version kind
static MIRROR_VERSIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "console_mirror_versions_total",
        "Versions processed by the release mirror",
        &["kind", "outcome"]
    )
    .unwrap()
});

/// Record a handshake step (`authorize`, `callback`) and its outcome
pub fn record_authorization(provider: &str, step: &str, outcome: &str) {
    AUTHORIZATIONS_TOTAL
        .with_label_values(&[provider, step, outcome])
        .inc();
}

/// Record a dispatched call
pub fn record_dispatch(provider: &str, outcome: &str, duration_secs: f64) {
    DISPATCHES_TOTAL.with_label_values(&[provider, outcome]).inc();
    DISPATCH_DURATION
        .with_label_values(&[provider])
        .observe(duration_secs);
}

/// Record one version processed by the mirror
pub fn record_mirror_version(kind: &str, outcome: &str) {
    MIRROR_VERSIONS_TOTAL.with_label_values(&[kind, outcome]).inc();
}

/// Get Prometheus metrics in text format
pub fn get_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ConsoleError::config(format!("Failed to encode metrics: {}", e)))?;

    String::from_utf8(buffer)
        .map_err(|e| ConsoleError::config(format!("Failed to convert metrics to UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_metrics() {
        record_authorization("twitter", "authorize", "redirect");
        record_dispatch("twitter", "ok", 0.05);
        record_mirror_version("release", "installed");

        let metrics = get_metrics().unwrap();

        assert!(metrics.contains("console_authorizations_total"));
        assert!(metrics.contains("console_dispatches_total"));
        assert!(metrics.contains("console_dispatch_duration_seconds"));
        assert!(metrics.contains("console_mirror_versions_total"));
    }
}
