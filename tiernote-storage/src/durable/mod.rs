//! Durable tier implementations.
//!
//! The PostgreSQL tier used in production is `tiernote_api::db::PgDurableTier`.

pub mod memory;

pub use memory::InMemoryDurableTier;
