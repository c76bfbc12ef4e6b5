//! Prometheus metrics for the prediction service.
//!
//! Covers HTTP traffic, prediction volume and latency, score distribution,
//! model state and training runs. Metrics live in a crate-wide registry and
//! are exported by the `/metrics` endpoint.
//!
//! # Example
//! ```no_run
//! use soil_productivity::metrics::{self, PREDICTIONS_TOTAL};
//!
//! metrics::init_metrics().unwrap();
//! PREDICTIONS_TOTAL.with_label_values(&["single"]).inc();
//! ```

pub mod middleware;

pub use middleware::track_metrics;

use lazy_static::lazy_static;
use once_cell::sync::OnceCell;
use prometheus::{
    CounterVec, Gauge, GaugeVec, Histogram, HistogramOpts, HistogramVec, IntCounter, Opts,
    Registry,
};

const NAMESPACE: &str = "soil_productivity";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    // ============================================================================
    // HTTP Metrics
    // ============================================================================

    /// Total number of HTTP requests received
    ///
    /// Labels: method, path, status_code
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests")
            .namespace(NAMESPACE),
        &["method", "path", "status_code"]
    ).expect("Failed to create HTTP_REQUESTS_TOTAL metric");

    /// HTTP request duration in seconds
    ///
    /// Labels: method, path
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric");

    // ============================================================================
    // Prediction Metrics
    // ============================================================================

    /// Successful prediction requests
    ///
    /// Labels: input_kind (single/batch/table)
    pub static ref PREDICTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("predictions_total", "Total number of successful prediction requests")
            .namespace(NAMESPACE),
        &["input_kind"]
    ).expect("Failed to create PREDICTIONS_TOTAL metric");

    /// Records scored across all requests
    pub static ref PREDICTED_RECORDS_TOTAL: IntCounter = IntCounter::with_opts(
        Opts::new("predicted_records_total", "Total number of records scored")
            .namespace(NAMESPACE)
    ).expect("Failed to create PREDICTED_RECORDS_TOTAL metric");

    /// Rejected or failed prediction requests
    ///
    /// Labels: reason (missing_feature/invalid_value/model_not_ready/...)
    pub static ref PREDICTION_FAILURES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("prediction_failures_total", "Total number of failed prediction requests")
            .namespace(NAMESPACE),
        &["reason"]
    ).expect("Failed to create PREDICTION_FAILURES_TOTAL metric");

    /// Time spent aligning and scoring one request
    ///
    /// Labels: input_kind
    pub static ref PREDICTION_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "prediction_duration_seconds",
            "Alignment and inference duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["input_kind"]
    ).expect("Failed to create PREDICTION_DURATION_SECONDS metric");

    /// Distribution of clamped productivity scores
    pub static ref PRODUCTIVITY_SCORES: Histogram = Histogram::with_opts(
        HistogramOpts::new("productivity_score", "Clamped productivity scores")
            .namespace(NAMESPACE)
            .buckets(vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0])
    ).expect("Failed to create PRODUCTIVITY_SCORES metric");

    // ============================================================================
    // Model Metrics
    // ============================================================================

    /// 1 while a model snapshot is installed
    pub static ref MODEL_LOADED: Gauge = Gauge::with_opts(
        Opts::new("model_loaded", "Whether a prediction model is loaded")
            .namespace(NAMESPACE)
    ).expect("Failed to create MODEL_LOADED metric");

    /// Training runs
    ///
    /// Labels: outcome (success/failure)
    pub static ref MODEL_TRAININGS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("model_trainings_total", "Total number of model training runs")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create MODEL_TRAININGS_TOTAL metric");

    /// Application build info
    ///
    /// Labels: version
    pub static ref BUILD_INFO: GaugeVec = GaugeVec::new(
        Opts::new("build_info", "Application build information")
            .namespace(NAMESPACE),
        &["version"]
    ).expect("Failed to create BUILD_INFO metric");
}

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Register all metrics with [`PROMETHEUS_REGISTRY`].
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    INITIALIZED
        .get_or_try_init(|| {
            PROMETHEUS_REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
            PROMETHEUS_REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))?;

            PROMETHEUS_REGISTRY.register(Box::new(PREDICTIONS_TOTAL.clone()))?;
            PROMETHEUS_REGISTRY.register(Box::new(PREDICTED_RECORDS_TOTAL.clone()))?;
            PROMETHEUS_REGISTRY.register(Box::new(PREDICTION_FAILURES_TOTAL.clone()))?;
            PROMETHEUS_REGISTRY.register(Box::new(PREDICTION_DURATION_SECONDS.clone()))?;
            PROMETHEUS_REGISTRY.register(Box::new(PRODUCTIVITY_SCORES.clone()))?;

            PROMETHEUS_REGISTRY.register(Box::new(MODEL_LOADED.clone()))?;
            PROMETHEUS_REGISTRY.register(Box::new(MODEL_TRAININGS_TOTAL.clone()))?;
            PROMETHEUS_REGISTRY.register(Box::new(BUILD_INFO.clone()))?;

            BUILD_INFO
                .with_label_values(&[env!("CARGO_PKG_VERSION")])
                .set(1.0);

            tracing::info!("Prometheus metrics initialized successfully");
            Ok(())
        })
        .map(|_| ())
}

/// Generate Prometheus text format metrics
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}
