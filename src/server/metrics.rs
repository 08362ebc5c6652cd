use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all kiosk metrics
const PREFIX: &str = "loyalty_kiosk";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Ledger Metrics
    pub static ref LEDGER_OPERATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_ledger_operations_total"), "Ledger operations by outcome"),
        &["operation", "outcome"]
    ).expect("Failed to create ledger_operations_total metric");

    pub static ref POINTS_ACCRUED_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_points_accrued_total"),
        "Total points added to accounts"
    ).expect("Failed to create points_accrued_total metric");

    pub static ref POINTS_REDEEMED_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_points_redeemed_total"),
        "Total points spent on redemptions"
    ).expect("Failed to create points_redeemed_total metric");

    // Store Metrics
    pub static ref STORE_CALL_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_store_call_duration_seconds"),
            "Point store round-trip duration in seconds"
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["operation"]
    ).expect("Failed to create store_call_duration_seconds metric");

    pub static ref STORE_ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_store_errors_total"), "Failed point store calls"),
        &["operation"]
    ).expect("Failed to create store_errors_total metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(LEDGER_OPERATIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(POINTS_ACCRUED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(POINTS_REDEEMED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(STORE_CALL_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(STORE_ERRORS_TOTAL.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record the outcome of a ledger operation: "ok" or the error kind.
pub fn record_ledger_operation(operation: &str, outcome: Result<(), &str>) {
    let outcome = match outcome {
        Ok(()) => "ok",
        Err(kind) => kind,
    };
    LEDGER_OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

pub fn record_points_accrued(points: u32) {
    POINTS_ACCRUED_TOTAL.inc_by(points as f64);
}

pub fn record_points_redeemed(points: u32) {
    POINTS_REDEEMED_TOTAL.inc_by(points as f64);
}

/// Record a round-trip to the point store
pub fn record_store_call(operation: &str, duration: Duration, success: bool) {
    STORE_CALL_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration.as_secs_f64());

    if !success {
        STORE_ERRORS_TOTAL.with_label_values(&[operation]).inc();
    }
}

/// Collapses phone numbers out of request paths so labels stay bounded.
pub fn categorize_endpoint(path: &str) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
                "{phone}"
            } else {
                segment
            }
        })
        .collect();
    segments.join("/")
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
