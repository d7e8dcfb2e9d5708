//! Health Check Endpoint
//!
//! `GET /health` probes both storage tiers. No authentication required.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router,
};
use serde::{Deserialize, Serialize};
use tiernote_core::NoteResult;
use tiernote_storage::NoteStore;

use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: TierComponents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierComponents {
    pub cache: ComponentHealth,
    pub durable: ComponentHealth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&NoteResult<()>> for ComponentHealth {
    fn from(probe: &NoteResult<()>) -> Self {
        match probe {
            Ok(()) => Self {
                status: HealthStatus::Healthy,
                error: None,
            },
            Err(e) => Self {
                status: HealthStatus::Unhealthy,
                error: Some(e.to_string()),
            },
        }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health - 200 when both tiers answer, 503 otherwise.
pub async fn health(
    State(store): State<Arc<NoteStore>>,
    State(start_time): State<Instant>,
) -> impl IntoResponse {
    let probe = store.health().await;
    let healthy = probe.is_healthy();

    if !healthy {
        tracing::warn!(
            cache_ok = probe.cache.is_ok(),
            durable_ok = probe.durable.is_ok(),
            "Health check failed"
        );
    }

    let response = HealthResponse {
        status: if healthy {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: start_time.elapsed().as_secs(),
        components: TierComponents {
            cache: ComponentHealth::from(&probe.cache),
            durable: ComponentHealth::from(&probe.durable),
        },
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
