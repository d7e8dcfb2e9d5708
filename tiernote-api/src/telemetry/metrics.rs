//! Prometheus Metrics Definitions
//!
//! Defines all tiernote metrics with appropriate labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram_vec, Counter,
    CounterVec, Encoder, Gauge, HistogramVec, TextEncoder,
};
use tiernote_storage::Eviction;

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<TiernoteMetrics>> = Lazy::new(TiernoteMetrics::new);

/// Container for all tiernote metrics.
#[derive(Clone)]
pub struct TiernoteMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Note mutations - labels: op (add/delete), status (success/error)
    pub note_mutations_total: CounterVec,

    /// Completed cache-to-durable evictions
    pub cache_evictions_total: Counter,

    /// Notes moved by evictions
    pub notes_evicted_total: Counter,

    /// Current active WebSocket connections
    pub websocket_connections: Gauge,
}

impl TiernoteMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "tiernote_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_requests_total: {}", e)))?,

            http_request_duration_seconds: register_histogram_vec!(
                "tiernote_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_request_duration_seconds: {}", e)))?,

            note_mutations_total: register_counter_vec!(
                "tiernote_note_mutations_total",
                "Total number of note mutations",
                &["op", "status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register note_mutations_total: {}", e)))?,

            cache_evictions_total: register_counter!(
                "tiernote_cache_evictions_total",
                "Total number of cache evictions to the durable tier"
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register cache_evictions_total: {}", e)))?,

            notes_evicted_total: register_counter!(
                "tiernote_notes_evicted_total",
                "Total number of notes moved to the durable tier"
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register notes_evicted_total: {}", e)))?,

            websocket_connections: register_gauge!(
                "tiernote_websocket_connections",
                "Current number of active WebSocket connections"
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register websocket_connections: {}", e)))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, status_str.as_str()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record a note mutation.
    pub fn record_mutation(&self, op: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        self.note_mutations_total
            .with_label_values(&[op, status])
            .inc();
    }

    /// Record the eviction outcome of an add.
    pub fn record_eviction(&self, eviction: &Eviction) {
        if let Eviction::Evicted { moved } = eviction {
            self.cache_evictions_total.inc();
            self.notes_evicted_total.inc_by(*moved as f64);
        }
    }

    /// Increment WebSocket connection count.
    pub fn ws_connected(&self) {
        self.websocket_connections.inc();
    }

    /// Decrement WebSocket connection count.
    pub fn ws_disconnected(&self) {
        self.websocket_connections.dec();
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
