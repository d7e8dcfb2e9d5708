//! tiernote Storage - Tiers, Migration and Fan-out
//!
//! Notes live in one of two tiers:
//!
//! ```text
//! ┌──────────────────────────┬──────────────────────────────┐
//! │ CacheTier                │ DurableTier                  │
//! │ one key, whole-list r/w  │ one record per note          │
//! │ bounded by threshold T   │ unbounded                    │
//! └──────────────────────────┴──────────────────────────────┘
//! ```
//!
//! New notes always land in the cache. When the cache holds more than `T`
//! notes, [`MigrationPolicy`] moves all of them to the durable tier and empties
//! the cache. [`ReadMerger`] presents durable notes followed by cached notes,
//! and [`NoteStore`] routes mutations and publishes the merged list on the
//! [`NotificationBus`] after each one.
//!
//! The PostgreSQL durable tier lives in `tiernote-api`; this crate ships the
//! LMDB cache tier and in-memory versions of both tiers.

pub mod bus;
pub mod cache;
pub mod durable;
pub mod merge;
pub mod migration;
pub mod store;
pub mod tier;

pub use bus::{NotesChanged, NotificationBus};
pub use cache::{InMemoryCacheTier, LmdbCacheError, LmdbCacheTier};
pub use durable::InMemoryDurableTier;
pub use merge::ReadMerger;
pub use migration::{Eviction, EvictionError, MigrationPolicy, DEFAULT_CACHE_THRESHOLD};
pub use store::{DeleteRoute, Mutation, MutationKind, NoteStore, TierHealth};
pub use tier::{CacheTier, DurableTier};
