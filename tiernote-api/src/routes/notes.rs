//! Note read endpoint.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use tiernote_core::NoteRecord;
use tiernote_storage::NoteStore;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /fetchAllnotes - durable notes followed by cached notes.
///
/// Any tier failure is reported as a plain 500 without details.
pub async fn fetch_all_notes(
    State(store): State<Arc<NoteStore>>,
) -> ApiResult<Json<Vec<NoteRecord>>> {
    let notes = store.all_notes().await.map_err(|e| {
        tracing::error!(error = %e, "Error fetching notes");
        ApiError::internal_error("Failed to fetch notes")
    })?;
    Ok(Json(notes))
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/fetchAllnotes", get(fetch_all_notes))
}
