//! Cache tier implementations.
//!
//! - [`LmdbCacheTier`]: memory-mapped LMDB environment, used by the server.
//! - [`InMemoryCacheTier`]: process-local, used by tests.

pub mod lmdb;
pub mod memory;

pub use lmdb::{LmdbCacheError, LmdbCacheTier, DEFAULT_CACHE_KEY};
pub use memory::InMemoryCacheTier;
