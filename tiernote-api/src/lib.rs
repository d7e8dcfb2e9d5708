//! tiernote API - HTTP/WebSocket Server
//!
//! Serves the tiered note store: a merged read over HTTP and a WebSocket
//! channel for adds, deletes and change fan-out. Wires the LMDB cache tier
//! and the PostgreSQL durable tier into a [`NoteStore`](tiernote_storage::NoteStore).

#[macro_use]
pub mod macros;

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod ws;

// Re-export commonly used types
pub use config::{ApiConfig, CacheConfig};
pub use db::{DbConfig, PgDurableTier};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use events::{ClientMessage, MutationOp, WsEvent};
pub use routes::create_api_router;
pub use state::AppState;
pub use ws::WsState;
