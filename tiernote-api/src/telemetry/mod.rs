//! tiernote Telemetry - Observability Infrastructure
//!
//! Structured logging via tracing-subscriber and Prometheus metrics for the
//! server. Nothing here needs an external collector.

pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metrics::{metrics_handler, TiernoteMetrics, METRICS};
pub use middleware::observability_middleware;
pub use tracer::{init_tracing, LogFormat, TelemetryConfig};
