/// Metrics and telemetry for the OpenDiscovery resolver
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Lookup outcomes
/// - Cache hit/miss rates per track
/// - Provider fetches and redirect seeding
/// - Background job execution

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder,
    HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .unwrap();

    // ========== Resolution Metrics ==========

    /// Lookups by outcome of the official track
    pub static ref LOOKUPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "discovery_lookups_total",
        "Total number of identifier lookups",
        &["outcome"]
    )
    .unwrap();

    /// Cache hits by track
    pub static ref CACHE_HITS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "discovery_cache_hits_total",
        "Total number of cache hits",
        &["track"]
    )
    .unwrap();

    /// Cache misses by track
    pub static ref CACHE_MISSES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "discovery_cache_misses_total",
        "Total number of cache misses",
        &["track"]
    )
    .unwrap();

    /// Provider fetches by track and status
    pub static ref PROVIDER_FETCHES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "discovery_provider_fetches_total",
        "Total number of provider fetches",
        &["track", "status"]
    )
    .unwrap();

    /// Chains that ended in a synthetic error, by track
    pub static ref CHAIN_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "discovery_chain_failures_total",
        "Total number of resolution chains that failed",
        &["track"]
    )
    .unwrap();

    /// Redirect records written to the cache while resolving
    pub static ref REDIRECTS_SEEDED_TOTAL: IntCounter = register_int_counter!(
        "discovery_redirects_seeded_total",
        "Total number of redirect records seeded into the cache"
    )
    .unwrap();

    // ========== Background Job Metrics ==========

    /// Background job executions by job type and status
    pub static ref BACKGROUND_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "background_jobs_total",
        "Total number of background job executions",
        &["job_type", "status"]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record a finished lookup
pub fn record_lookup(official_ok: bool) {
    LOOKUPS_TOTAL
        .with_label_values(&[if official_ok { "resolved" } else { "failed" }])
        .inc();
}

/// Record a cache access for a track
pub fn record_cache_access(track: &str, hit: bool) {
    if hit {
        CACHE_HITS_TOTAL.with_label_values(&[track]).inc();
    } else {
        CACHE_MISSES_TOTAL.with_label_values(&[track]).inc();
    }
}

/// Record a single provider fetch
pub fn record_provider_fetch(track: &str, success: bool) {
    PROVIDER_FETCHES_TOTAL
        .with_label_values(&[track, if success { "success" } else { "failure" }])
        .inc();
}

pub fn record_chain_failure(track: &str) {
    CHAIN_FAILURES_TOTAL.with_label_values(&[track]).inc();
}

pub fn record_redirect_seeded() {
    REDIRECTS_SEEDED_TOTAL.inc();
}

/// Record a background job run
pub fn record_background_job(job_type: &str, status: &str) {
    BACKGROUND_JOBS_TOTAL
        .with_label_values(&[job_type, status])
        .inc();
}
