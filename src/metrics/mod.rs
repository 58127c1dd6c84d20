//! Prometheus metrics for the lookup service
//!
//! Tracks lookup outcomes, store latency and failures, and HTTP requests.
//!
//! # Usage
//!
//! Call `init_metrics()` at server startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all lookup service metrics
struct LookupMetrics {
    lookups: CounterVec,
    store_errors: CounterVec,
    store_duration: HistogramVec,
    http_requests: CounterVec,
    http_duration: HistogramVec,
}

/// Registered metrics, `None` when registration failed
static LOOKUP_METRICS: OnceLock<Option<LookupMetrics>> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

fn register() -> Result<LookupMetrics, prometheus::Error> {
    Ok(LookupMetrics {
        lookups: register_counter_vec!(
            "geoshort_lookups_total",
            "Lookups by outcome (ack, found, not_found)",
            &["outcome"]
        )?,
        store_errors: register_counter_vec!(
            "geoshort_store_errors_total",
            "Store failures surfaced to callers, by kind",
            &["kind"]
        )?,
        store_duration: register_histogram_vec!(
            "geoshort_store_request_duration_seconds",
            "Document store read latency in seconds, retries included",
            &["backend"],
            vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
        )?,
        http_requests: register_counter_vec!(
            "geoshort_http_requests_total",
            "HTTP requests by route and status",
            &["route", "status"]
        )?,
        http_duration: register_histogram_vec!(
            "geoshort_http_request_duration_seconds",
            "HTTP request duration in seconds",
            &["route"],
            vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
        )?,
    })
}

/// Initialize all Prometheus metrics
///
/// Safe to call more than once; only the first call registers. When
/// registration fails the error is logged and later calls keep failing
/// without retrying.
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    let metrics = LOOKUP_METRICS.get_or_init(|| match register() {
        Ok(metrics) => {
            tracing::info!("Prometheus metrics initialized successfully");
            Some(metrics)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Prometheus metrics registration failed");
            None
        }
    });

    if metrics.is_some() {
        Ok(())
    } else {
        Err("Prometheus metrics registration failed".into())
    }
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    matches!(LOOKUP_METRICS.get(), Some(Some(_)))
}

fn metrics() -> Option<&'static LookupMetrics> {
    LOOKUP_METRICS.get().and_then(Option::as_ref)
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record a lookup outcome
pub fn record_lookup(outcome: &str) {
    if let Some(m) = metrics() {
        m.lookups.with_label_values(&[outcome]).inc();
    }
}

/// Record a store failure returned to the caller
pub fn record_store_error(kind: &str) {
    if let Some(m) = metrics() {
        m.store_errors.with_label_values(&[kind]).inc();
    }
}

/// Record store read latency
pub fn record_store_duration(backend: &str, duration_secs: f64) {
    if let Some(m) = metrics() {
        m.store_duration
            .with_label_values(&[backend])
            .observe(duration_secs);
    }
}

/// Record an HTTP request
pub fn record_http_request(route: &str, status: u16, duration_secs: f64) {
    let Some(m) = metrics() else {
        return;
    };

    let status_str = status.to_string();
    m.http_requests
        .with_label_values(&[route, &status_str])
        .inc();
    m.http_duration
        .with_label_values(&[route])
        .observe(duration_secs);
}
