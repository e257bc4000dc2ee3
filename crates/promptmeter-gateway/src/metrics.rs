//! Prometheus metrics for the Promptmeter gateway
//!
//! Exposes request, estimation, cache, and provider metrics for monitoring.

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge_vec, register_histogram,
    register_histogram_vec, Counter, CounterVec, GaugeVec, Histogram, HistogramVec,
};

lazy_static! {
    // ============================================================================
    // HTTP Metrics
    // ============================================================================

    /// HTTP requests by method and path
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec =
        register_counter_vec!("promptmeter_http_requests_total", "Total HTTP requests", &["method", "path"]).unwrap();

    /// HTTP request latency
    pub static ref HTTP_LATENCY: HistogramVec = register_histogram_vec!(
        "promptmeter_http_latency_seconds",
        "HTTP request latency in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    ).unwrap();

    /// HTTP response status codes
    pub static ref HTTP_RESPONSES: CounterVec =
        register_counter_vec!("promptmeter_http_responses_total", "HTTP responses by status code", &["method", "path", "status"]).unwrap();

    // ============================================================================
    // Estimation Metrics
    // ============================================================================

    /// Total estimate requests processed
    pub static ref ESTIMATE_REQUESTS: Counter =
        register_counter!("promptmeter_estimate_requests_total", "Total estimate requests").unwrap();

    /// Estimate computation latency
    pub static ref ESTIMATE_LATENCY: Histogram = register_histogram!(
        "promptmeter_estimate_latency_seconds",
        "Estimate computation latency in seconds",
        vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]
    ).unwrap();

    /// Cache hits and misses on the estimate path
    pub static ref CACHE_HITS: Counter =
        register_counter!("promptmeter_cache_hits_total", "Estimate cache hits").unwrap();
    pub static ref CACHE_MISSES: Counter =
        register_counter!("promptmeter_cache_misses_total", "Estimate cache misses").unwrap();

    // ============================================================================
    // AI Provider Metrics
    // ============================================================================

    /// AI provider requests
    pub static ref AI_REQUESTS_TOTAL: CounterVec =
        register_counter_vec!("promptmeter_ai_requests_total", "Total AI provider requests", &["provider"]).unwrap();

    /// AI provider errors
    pub static ref AI_ERRORS: CounterVec =
        register_counter_vec!("promptmeter_ai_errors_total", "AI provider errors", &["provider", "error_type"]).unwrap();

    /// AI request latency
    pub static ref AI_LATENCY: HistogramVec = register_histogram_vec!(
        "promptmeter_ai_latency_seconds",
        "AI request latency in seconds",
        &["provider"],
        vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    ).unwrap();

    /// AI tokens used, prompt and completion sides
    pub static ref AI_TOKENS_TOTAL: CounterVec =
        register_counter_vec!("promptmeter_ai_tokens_total", "Total AI tokens used", &["provider", "type"]).unwrap();

    // ============================================================================
    // System Metrics
    // ============================================================================

    /// Build info
    pub static ref BUILD_INFO: GaugeVec =
        register_gauge_vec!("promptmeter_build_info", "Build information", &["version", "commit"]).unwrap();
}

/// Initialize metrics with build info
pub fn init_metrics() {
    BUILD_INFO
        .with_label_values(&[
            env!("CARGO_PKG_VERSION"),
            option_env!("GIT_COMMIT_SHA").unwrap_or("unknown"),
        ])
        .set(1.0);
}

/// Export metrics in Prometheus format
pub fn export() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
