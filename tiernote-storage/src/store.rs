//! Mutation routing.
//!
//! [`NoteStore`] is the only writer of both tiers. Adds and deletes run inside
//! one async mutex, which makes the cache's read-modify-write cycle atomic
//! within the process and keeps publication order equal to mutation order.
//! Reads go straight through [`ReadMerger`] without the lock.

use std::collections::HashSet;
use std::sync::Arc;

use tiernote_core::{NoteError, NoteId, NoteRecord, NoteResult};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::bus::{NotesChanged, NotificationBus};
use crate::merge::ReadMerger;
use crate::migration::{Eviction, EvictionError, MigrationPolicy};
use crate::tier::{CacheTier, DurableTier};

/// Which tier a delete was resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteRoute {
    /// The id was in the cache; the durable tier was not touched.
    Cache,
    /// The id was not cached, so the durable delete ran. The id may not have
    /// existed anywhere.
    Durable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    Added(NoteRecord),
    Deleted { id: NoteId, route: DeleteRoute },
}

/// Outcome of a successful add or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub kind: MutationKind,
    /// Set for adds only.
    pub eviction: Option<Eviction>,
    /// Exactly what subscribers received.
    pub published: NotesChanged,
}

/// Result of probing both tiers.
#[derive(Debug, Clone)]
pub struct TierHealth {
    pub cache: NoteResult<()>,
    pub durable: NoteResult<()>,
}

impl TierHealth {
    pub fn is_healthy(&self) -> bool {
        self.cache.is_ok() && self.durable.is_ok()
    }
}

/// State owned by the write lock.
#[derive(Debug, Default)]
struct WriteState {
    /// Ids already copied to the durable tier whose cache clear failed.
    unfinished_eviction: Vec<NoteId>,
}

/// Routes adds and deletes to the right tier, runs overflow migration and
/// publishes the merged list after every successful mutation.
pub struct NoteStore {
    cache: Arc<dyn CacheTier>,
    durable: Arc<dyn DurableTier>,
    merger: ReadMerger,
    policy: MigrationPolicy,
    bus: Arc<NotificationBus>,
    write: Mutex<WriteState>,
}

impl NoteStore {
    pub fn new(
        cache: Arc<dyn CacheTier>,
        durable: Arc<dyn DurableTier>,
        policy: MigrationPolicy,
        bus: Arc<NotificationBus>,
    ) -> Self {
        Self {
            merger: ReadMerger::new(cache.clone(), durable.clone()),
            cache,
            durable,
            policy,
            bus,
            write: Mutex::new(WriteState::default()),
        }
    }

    pub fn bus(&self) -> &Arc<NotificationBus> {
        &self.bus
    }

    pub fn policy(&self) -> MigrationPolicy {
        self.policy
    }

    /// Durable records followed by cached records.
    pub async fn all_notes(&self) -> NoteResult<Vec<NoteRecord>> {
        self.merger.all_notes().await
    }

    /// Create a note in the cache, evict if the cache overflowed, publish.
    ///
    /// The text is stored as given. On error nothing is published.
    ///
    /// An eviction failure is reported after the note was already appended.
    /// The note stays cached and shows up in the next successful
    /// publication, and the error text says so; retrying the add would
    /// create a second note.
    pub async fn add(&self, text: impl Into<String>) -> NoteResult<Mutation> {
        let mut state = self.write.lock().await;
        self.finish_eviction(&mut state).await?;

        let record = NoteRecord::new(text);
        let cache_len = self.cache.append(record.clone()).await.map_err(|e| {
            error!(id = %record.id, error = %e, "Failed to append note to cache");
            e
        })?;
        debug!(id = %record.id, cache_len = cache_len, "Note appended to cache");

        let eviction = match self
            .policy
            .maybe_evict(self.cache.as_ref(), self.durable.as_ref())
            .await
        {
            Ok(eviction) => eviction,
            Err(e) => {
                error!(id = %record.id, error = %e, "Eviction failed after add");
                if let EvictionError::ClearFailed { migrated, .. } = &e {
                    state.unfinished_eviction = migrated.clone();
                }
                return Err(NoteError::from(e).with_context(format_args!(
                    "note {} was stored but overflow migration failed",
                    record.id
                )));
            }
        };

        let published = self.publish().await?;
        info!(
            id = %record.id,
            revision = published.revision,
            moved = eviction.moved(),
            "Note added"
        );

        Ok(Mutation {
            kind: MutationKind::Added(record),
            eviction: Some(eviction),
            published,
        })
    }

    /// Delete from the cache if present there, otherwise from the durable
    /// tier. Unknown ids succeed and still publish.
    pub async fn delete(&self, id: &str) -> NoteResult<Mutation> {
        let mut state = self.write.lock().await;
        self.finish_eviction(&mut state).await?;

        let removed = self.cache.remove_by_id(id).await.map_err(|e| {
            error!(id = %id, error = %e, "Failed to delete note from cache");
            e
        })?;

        let route = if removed {
            DeleteRoute::Cache
        } else {
            self.durable.delete_by_id(id).await.map_err(|e| {
                error!(id = %id, error = %e, "Failed to delete note from durable tier");
                e
            })?;
            DeleteRoute::Durable
        };

        let published = self.publish().await?;
        info!(id = %id, route = ?route, revision = published.revision, "Note deleted");

        Ok(Mutation {
            kind: MutationKind::Deleted {
                id: id.to_string(),
                route,
            },
            eviction: None,
            published,
        })
    }

    /// Drop from the cache every id the durable tier already holds. Run once
    /// at startup to repair an eviction interrupted by a crash. Returns the
    /// number of cache entries removed.
    pub async fn reconcile(&self) -> NoteResult<usize> {
        let mut state = self.write.lock().await;

        let durable_ids: HashSet<NoteId> = self
            .durable
            .scan_all()
            .await?
            .into_iter()
            .map(|record| record.id)
            .collect();
        let removed = self.remove_cached(&durable_ids).await?;
        state.unfinished_eviction.clear();

        if removed > 0 {
            warn!(removed = removed, "Removed cache entries already in durable tier");
        } else {
            debug!("Cache and durable tier are disjoint");
        }
        Ok(removed)
    }

    /// Probe both tiers.
    pub async fn health(&self) -> TierHealth {
        let (cache, durable) = tokio::join!(self.cache.ping(), self.durable.ping());
        TierHealth { cache, durable }
    }

    async fn publish(&self) -> NoteResult<NotesChanged> {
        let notes = self.merger.all_notes().await.map_err(|e| {
            error!(error = %e, "Failed to read notes for publication");
            e
        })?;
        Ok(self.bus.publish(notes))
    }

    async fn finish_eviction(&self, state: &mut WriteState) -> NoteResult<()> {
        if state.unfinished_eviction.is_empty() {
            return Ok(());
        }
        let ids: HashSet<NoteId> = state.unfinished_eviction.iter().cloned().collect();
        let removed = self.remove_cached(&ids).await.map_err(|e| {
            warn!(pending = ids.len(), error = %e, "Could not finish interrupted eviction");
            e
        })?;
        info!(removed = removed, "Finished interrupted eviction");
        state.unfinished_eviction.clear();
        Ok(())
    }

    async fn remove_cached(&self, ids: &HashSet<NoteId>) -> Result<usize, NoteError> {
        let mut cached = self.cache.load().await?;
        let before = cached.len();
        cached.retain(|record| !ids.contains(&record.id));
        let removed = before - cached.len();
        if removed > 0 {
            self.cache.store(&cached).await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryCacheTier, InMemoryDurableTier};

    fn store_with(
        threshold: usize,
    ) -> (NoteStore, Arc<InMemoryCacheTier>, Arc<InMemoryDurableTier>) {
        let cache = Arc::new(InMemoryCacheTier::new());
        let durable = Arc::new(InMemoryDurableTier::new());
        let store = NoteStore::new(
            cache.clone(),
            durable.clone(),
            MigrationPolicy::new(threshold),
            Arc::new(NotificationBus::new(16)),
        );
        (store, cache, durable)
    }

    #[tokio::test]
    async fn test_add_lands_in_cache() {
        let (store, cache, durable) = store_with(2);
        let mutation = store.add("buy milk").await.unwrap();

        let MutationKind::Added(record) = &mutation.kind else {
            panic!("expected add");
        };
        assert_eq!(record.text, "buy milk");
        assert!(!record.completed);
        assert_eq!(cache.snapshot(), vec![record.clone()]);
        assert!(durable.snapshot().is_empty());
        assert_eq!(mutation.eviction, Some(Eviction::NotNeeded { cache_len: 1 }));
    }

    #[tokio::test]
    async fn test_empty_text_is_accepted() {
        let (store, _, _) = store_with(2);
        assert!(store.add("").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_routes() {
        let (store, _, _) = store_with(0);
        let first = store.add("a").await.unwrap();
        let MutationKind::Added(evicted) = first.kind else {
            panic!("expected add");
        };

        let deleted = store.delete(&evicted.id).await.unwrap();
        assert_eq!(
            deleted.kind,
            MutationKind::Deleted {
                id: evicted.id.clone(),
                route: DeleteRoute::Durable
            }
        );
        assert!(deleted.eviction.is_none());
    }

    #[tokio::test]
    async fn test_health_reports_each_tier() {
        let (store, cache, _) = store_with(2);
        assert!(store.health().await.is_healthy());

        cache.set_available(false);
        let health = store.health().await;
        assert!(health.cache.is_err());
        assert!(health.durable.is_ok());
        assert!(!health.is_healthy());
    }
}
