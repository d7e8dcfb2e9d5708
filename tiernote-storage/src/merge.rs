//! Merged read across both tiers.

use std::sync::Arc;

use tiernote_core::{NoteRecord, NoteResult};

use crate::tier::{CacheTier, DurableTier};

/// Presents the externally visible note list: durable records first, then
/// cached records, each in their tier's own order. No deduplication.
///
/// The cache is read before the durable tier. An eviction landing between
/// the two reads then shows the moved notes twice instead of not at all.
#[derive(Clone)]
pub struct ReadMerger {
    cache: Arc<dyn CacheTier>,
    durable: Arc<dyn DurableTier>,
}

impl ReadMerger {
    pub fn new(cache: Arc<dyn CacheTier>, durable: Arc<dyn DurableTier>) -> Self {
        Self { cache, durable }
    }

    pub async fn all_notes(&self) -> NoteResult<Vec<NoteRecord>> {
        let cached = self.cache.load().await?;
        let mut notes = self.durable.scan_all().await?;
        notes.extend(cached);
        Ok(notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryCacheTier, InMemoryDurableTier};

    #[tokio::test]
    async fn test_durable_precedes_cache() {
        let cache = Arc::new(InMemoryCacheTier::new());
        let durable = Arc::new(InMemoryDurableTier::new());
        let old = NoteRecord::new("old");
        let new = NoteRecord::new("new");
        durable.insert_many(&[old.clone()]).await.unwrap();
        cache.append(new.clone()).await.unwrap();

        let merger = ReadMerger::new(cache, durable);
        assert_eq!(merger.all_notes().await.unwrap(), vec![old, new]);
    }

    #[tokio::test]
    async fn test_either_tier_down_fails_the_read() {
        let cache = Arc::new(InMemoryCacheTier::new());
        let durable = Arc::new(InMemoryDurableTier::new());
        let merger = ReadMerger::new(cache.clone(), durable.clone());

        cache.set_available(false);
        assert!(merger.all_notes().await.is_err());

        cache.set_available(true);
        durable.set_available(false);
        assert!(merger.all_notes().await.is_err());
    }
}
