//! HTTP Routes Module
//!
//! - `GET /fetchAllnotes`: merged note list
//! - `GET /ws`: real-time channel
//! - `GET /health`: tier probes
//! - `GET /metrics`: Prometheus exposition
//!
//! CORS allows any origin unless origins are configured.

pub mod health;
pub mod notes;

use std::time::Duration;

use axum::{
    http::{header, request::Parts, HeaderValue, Method},
    middleware::from_fn,
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};
use crate::ws::ws_handler;

pub use health::create_router as health_router;
pub use notes::create_router as notes_router;

fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!("CORS: allowing origins: {:?}", config.cors_origins);
        let config = config.clone();
        cors.allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _: &Parts| {
                origin
                    .to_str()
                    .map(|o| config.is_origin_allowed(o))
                    .unwrap_or(false)
            },
        ))
    }
}

/// Create the complete router.
pub fn create_api_router(state: AppState, config: &ApiConfig) -> Router {
    Router::new()
        .merge(notes_router())
        .merge(health_router())
        .route("/ws", get(ws_handler))
        .route("/metrics", get(metrics_handler))
        .layer(from_fn(observability_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(config))
        .with_state(state)
}
