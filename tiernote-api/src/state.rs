//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use tiernote_storage::NoteStore;

use crate::ws::WsState;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Tiered note store; every read and mutation goes through it.
    pub store: Arc<NoteStore>,
    pub ws: Arc<WsState>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<NoteStore>) -> Self {
        Self {
            ws: Arc::new(WsState::new(store.clone())),
            store,
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(Arc<NoteStore>, store);
crate::impl_from_ref!(Arc<WsState>, ws);
crate::impl_from_ref!(Instant, start_time);
