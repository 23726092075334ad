use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, GaugeVec, HistogramOpts, HistogramVec, IntCounter, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all chordmatch metrics
const PREFIX: &str = "chordmatch";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "endpoint"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Similarity Metrics
    pub static ref SIMILARITY_QUERIES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_similarity_queries_total"), "Similarity queries by kind and outcome"),
        &["kind", "outcome"]
    ).expect("Failed to create similarity_queries_total metric");

    pub static ref SIMILARITY_QUERY_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_similarity_query_duration_seconds"),
            "Time spent ranking the corpus for one query"
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["kind"]
    ).expect("Failed to create similarity_query_duration_seconds metric");

    pub static ref ASSEMBLER_DROPPED_ROWS_TOTAL: IntCounter = IntCounter::new(
        format!("{PREFIX}_assembler_dropped_rows_total"),
        "Ranked matches dropped because their song was missing from the corpus"
    ).expect("Failed to create assembler_dropped_rows_total metric");

    // Corpus Metrics
    pub static ref CORPUS_ITEMS_TOTAL: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_corpus_items_total"), "Items in the active corpus"),
        &["type"]
    ).expect("Failed to create corpus_items_total metric");

    pub static ref CORPUS_RELOADS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_corpus_reloads_total"), "Corpus reload attempts"),
        &["outcome"]
    ).expect("Failed to create corpus_reloads_total metric");

    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(SIMILARITY_QUERIES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(SIMILARITY_QUERY_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(ASSEMBLER_DROPPED_ROWS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(CORPUS_ITEMS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(CORPUS_RELOADS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

pub fn set_corpus_metrics(num_songs: usize, num_indexed: usize, num_classes: usize) {
    CORPUS_ITEMS_TOTAL
        .with_label_values(&["song"])
        .set(num_songs as f64);
    CORPUS_ITEMS_TOTAL
        .with_label_values(&["indexed"])
        .set(num_indexed as f64);
    CORPUS_ITEMS_TOTAL
        .with_label_values(&["key_class"])
        .set(num_classes as f64);
}

/// Groups request paths so labels stay bounded.
pub fn categorize_endpoint(path: &str) -> &'static str {
    match path {
        "/" => "corpus",
        "/sim-by-song" => "sim_by_song",
        "/sim-by-prog" => "sim_by_prog",
        "/stats" => "stats",
        "/reload" => "reload",
        _ => "other",
    }
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let endpoint = categorize_endpoint(path);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, endpoint])
        .observe(duration.as_secs_f64());
}

/// Record a similarity query. `outcome` is "ok" or an error kind.
pub fn record_similarity_query(kind: &str, outcome: &str, duration: Duration) {
    SIMILARITY_QUERIES_TOTAL
        .with_label_values(&[kind, outcome])
        .inc();

    SIMILARITY_QUERY_DURATION_SECONDS
        .with_label_values(&[kind])
        .observe(duration.as_secs_f64());
}

pub fn record_dropped_rows(count: usize) {
    ASSEMBLER_DROPPED_ROWS_TOTAL.inc_by(count as u64);
}

pub fn record_reload(outcome: &str) {
    CORPUS_RELOADS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Update process memory usage
pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            for line in status.lines() {
                if line.starts_with("VmRSS:") {
                    // RSS is reported in kB
                    if let Some(kb_str) = line.split_whitespace().nth(1) {
                        if let Ok(kb) = kb_str.parse::<f64>() {
                            PROCESS_MEMORY_BYTES.set(kb * 1024.0);
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

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
