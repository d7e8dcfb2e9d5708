//! Overflow migration from the cache tier to the durable tier.
//!
//! # Protocol
//!
//! 1. Load the cache. If it holds `threshold` notes or fewer, stop.
//! 2. `insert_many` every cached note into the durable tier.
//! 3. Overwrite the cache with an empty collection.
//!
//! The two writes are not transactional. A failure before step 2 completes
//! leaves the cache untouched ([`EvictionError::Aborted`]). A failure in
//! step 3 leaves the notes in both tiers ([`EvictionError::ClearFailed`]);
//! the error carries the moved ids so the caller can finish the job later.

use tiernote_core::{NoteError, NoteId};
use tracing::{debug, info, warn};

use crate::tier::{CacheTier, DurableTier};

/// Cache size above which notes move to the durable tier.
pub const DEFAULT_CACHE_THRESHOLD: usize = 50;

/// What one [`MigrationPolicy::maybe_evict`] call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eviction {
    /// Cache was within bounds.
    NotNeeded { cache_len: usize },
    /// Every cached note moved to the durable tier; the cache is now empty.
    Evicted { moved: usize },
}

impl Eviction {
    pub fn moved(&self) -> usize {
        match self {
            Eviction::NotNeeded { .. } => 0,
            Eviction::Evicted { moved } => *moved,
        }
    }
}

/// Failure of an eviction, split by how far it got.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EvictionError {
    /// Nothing was written; the cache is unchanged.
    #[error("eviction aborted before copying: {0}")]
    Aborted(NoteError),

    /// The durable tier has the notes but the cache still holds them too.
    #[error("cache clear failed after copying {} notes: {source}", .migrated.len())]
    ClearFailed {
        migrated: Vec<NoteId>,
        source: NoteError,
    },
}

impl From<EvictionError> for NoteError {
    fn from(e: EvictionError) -> Self {
        match e {
            EvictionError::Aborted(source) => source,
            EvictionError::ClearFailed { source, .. } => source,
        }
    }
}

/// Size-triggered, all-or-nothing relocation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationPolicy {
    threshold: usize,
}

impl Default for MigrationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_THRESHOLD)
    }
}

impl MigrationPolicy {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Strictly greater: exactly `threshold` notes stay in the cache.
    pub fn should_evict(&self, cache_len: usize) -> bool {
        cache_len > self.threshold
    }

    /// Check the cache and relocate all of it when over threshold.
    pub async fn maybe_evict(
        &self,
        cache: &dyn CacheTier,
        durable: &dyn DurableTier,
    ) -> Result<Eviction, EvictionError> {
        let cached = cache.load().await.map_err(EvictionError::Aborted)?;

        if !self.should_evict(cached.len()) {
            debug!(
                cache_len = cached.len(),
                threshold = self.threshold,
                "Cache within threshold"
            );
            return Ok(Eviction::NotNeeded {
                cache_len: cached.len(),
            });
        }

        info!(
            cache_len = cached.len(),
            threshold = self.threshold,
            "Cache over threshold, moving notes to durable tier"
        );

        durable
            .insert_many(&cached)
            .await
            .map_err(EvictionError::Aborted)?;

        if let Err(source) = cache.store(&[]).await {
            warn!(
                moved = cached.len(),
                error = %source,
                "Notes copied to durable tier but cache clear failed"
            );
            return Err(EvictionError::ClearFailed {
                migrated: cached.into_iter().map(|note| note.id).collect(),
                source,
            });
        }

        info!(moved = cached.len(), "Notes moved to durable tier and cache cleared");
        Ok(Eviction::Evicted {
            moved: cached.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryCacheTier, InMemoryDurableTier};
    use tiernote_core::NoteRecord;

    async fn fill(cache: &InMemoryCacheTier, count: usize) -> Vec<NoteRecord> {
        let notes: Vec<NoteRecord> = (0..count)
            .map(|i| NoteRecord::new(format!("note {}", i)))
            .collect();
        cache.store(&notes).await.unwrap();
        notes
    }

    #[test]
    fn test_threshold_is_strict() {
        let policy = MigrationPolicy::new(2);
        assert!(!policy.should_evict(2));
        assert!(policy.should_evict(3));
        assert_eq!(MigrationPolicy::default().threshold(), 50);
    }

    #[tokio::test]
    async fn test_at_threshold_nothing_moves() {
        let cache = InMemoryCacheTier::new();
        let durable = InMemoryDurableTier::new();
        fill(&cache, 2).await;

        let outcome = MigrationPolicy::new(2).maybe_evict(&cache, &durable).await.unwrap();
        assert_eq!(outcome, Eviction::NotNeeded { cache_len: 2 });
        assert_eq!(durable.write_count(), 0);
    }

    #[tokio::test]
    async fn test_over_threshold_moves_everything() {
        let cache = InMemoryCacheTier::new();
        let durable = InMemoryDurableTier::new();
        let notes = fill(&cache, 3).await;

        let outcome = MigrationPolicy::new(2).maybe_evict(&cache, &durable).await.unwrap();
        assert_eq!(outcome, Eviction::Evicted { moved: 3 });
        assert!(cache.snapshot().is_empty());
        assert_eq!(durable.snapshot(), notes);
    }

    #[tokio::test]
    async fn test_durable_failure_leaves_cache_unchanged() {
        let cache = InMemoryCacheTier::new();
        let durable = InMemoryDurableTier::new();
        let notes = fill(&cache, 3).await;
        durable.set_available(false);

        let err = MigrationPolicy::new(2).maybe_evict(&cache, &durable).await.unwrap_err();
        assert!(matches!(err, EvictionError::Aborted(_)));
        assert_eq!(cache.snapshot(), notes);
    }

    #[tokio::test]
    async fn test_clear_failure_reports_migrated_ids() {
        let cache = InMemoryCacheTier::new();
        let durable = InMemoryDurableTier::new();
        let notes = fill(&cache, 3).await;
        cache.fail_store_after(0);

        let err = MigrationPolicy::new(2).maybe_evict(&cache, &durable).await.unwrap_err();
        match err {
            EvictionError::ClearFailed { migrated, .. } => {
                let expected: Vec<NoteId> = notes.iter().map(|n| n.id.clone()).collect();
                assert_eq!(migrated, expected);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // Both tiers hold the notes until the caller finishes the eviction.
        assert_eq!(cache.snapshot().len(), 3);
        assert_eq!(durable.snapshot().len(), 3);
    }
}
