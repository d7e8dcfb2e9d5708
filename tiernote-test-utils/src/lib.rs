//! tiernote Test Utilities
//!
//! Shared test infrastructure for the tiernote workspace:
//! - Proptest generators for note text and mutation sequences
//! - Fixtures wiring a [`NoteStore`] over in-memory tiers
//! - Assertions on tier contents

pub use tiernote_core::{NoteError, NoteId, NoteRecord, NoteResult, Tier, Timestamp};
pub use tiernote_storage::{
    CacheTier, DeleteRoute, DurableTier, Eviction, InMemoryCacheTier, InMemoryDurableTier,
    MigrationPolicy, Mutation, MutationKind, NoteStore, NotesChanged, NotificationBus,
};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for note inputs.

    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    /// Free-form note text, empty strings and unicode included.
    pub fn arb_note_text() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            "[a-zA-Z0-9 ]{1,40}",
            "\\PC{1,20}",
        ]
    }

    /// Timestamp between 2020 and 2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
        })
    }

    /// A complete record, as it would come back from either tier.
    pub fn arb_note_record() -> impl Strategy<Value = NoteRecord> {
        (arb_note_text(), any::<bool>(), arb_timestamp()).prop_map(
            |(text, completed, created_at)| {
                let mut record = NoteRecord::new(text);
                record.completed = completed;
                record.created_at = created_at;
                record
            },
        )
    }

    /// One step of a client session against a store.
    #[derive(Debug, Clone)]
    pub enum NoteOp {
        Add(String),
        /// Delete the live note at `index % live.len()`; unknown delete when
        /// nothing is live.
        DeleteExisting(usize),
        DeleteUnknown,
    }

    pub fn arb_note_op() -> impl Strategy<Value = NoteOp> {
        prop_oneof![
            3 => arb_note_text().prop_map(NoteOp::Add),
            2 => any::<usize>().prop_map(NoteOp::DeleteExisting),
            1 => Just(NoteOp::DeleteUnknown),
        ]
    }

    pub fn arb_note_ops(max_len: usize) -> impl Strategy<Value = Vec<NoteOp>> {
        prop::collection::vec(arb_note_op(), 0..max_len)
    }

    /// Small thresholds so short sequences cross them several times.
    pub fn arb_threshold() -> impl Strategy<Value = usize> {
        0usize..6
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! In-memory store wiring.

    use super::*;
    use std::sync::Arc;

    /// Id that no store will ever generate.
    pub const UNKNOWN_ID: &str = "zzz";

    /// A store over in-memory tiers, with handles to both tiers for
    /// inspection and failure injection.
    pub struct MemoryTiers {
        pub cache: Arc<InMemoryCacheTier>,
        pub durable: Arc<InMemoryDurableTier>,
        pub store: Arc<NoteStore>,
    }

    impl MemoryTiers {
        pub fn bus(&self) -> &Arc<NotificationBus> {
            self.store.bus()
        }
    }

    pub fn memory_store(threshold: usize) -> MemoryTiers {
        memory_store_with_capacity(threshold, 64)
    }

    pub fn memory_store_with_capacity(threshold: usize, bus_capacity: usize) -> MemoryTiers {
        let cache = Arc::new(InMemoryCacheTier::new());
        let durable = Arc::new(InMemoryDurableTier::new());
        let store = Arc::new(NoteStore::new(
            cache.clone(),
            durable.clone(),
            MigrationPolicy::new(threshold),
            Arc::new(NotificationBus::new(bus_capacity)),
        ));
        MemoryTiers {
            cache,
            durable,
            store,
        }
    }

    /// The record created by an add mutation.
    pub fn added(mutation: &Mutation) -> &NoteRecord {
        match &mutation.kind {
            MutationKind::Added(record) => record,
            other => panic!("expected an add mutation, got {:?}", other),
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on tier contents.

    use super::*;

    pub fn ids(records: &[NoteRecord]) -> Vec<NoteId> {
        records.iter().map(|record| record.id.clone()).collect()
    }

    /// Assert the ids held by each tier, in order.
    pub fn assert_tiers(
        cache: &InMemoryCacheTier,
        durable: &InMemoryDurableTier,
        expected_cache: &[&NoteRecord],
        expected_durable: &[&NoteRecord],
    ) {
        let want_cache: Vec<NoteId> = expected_cache.iter().map(|r| r.id.clone()).collect();
        let want_durable: Vec<NoteId> = expected_durable.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids(&cache.snapshot()), want_cache, "cache tier contents");
        assert_eq!(ids(&durable.snapshot()), want_durable, "durable tier contents");
    }

    pub fn assert_tier_unavailable<T: std::fmt::Debug>(result: &NoteResult<T>, tier: Tier) {
        match result {
            Err(err) => assert_eq!(err.tier(), tier, "wrong tier in {:?}", err),
            Ok(value) => panic!("expected {} tier unavailable, got Ok({:?})", tier, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;

    #[tokio::test]
    async fn test_memory_store_starts_empty() {
        let tiers = memory_store(2);
        assert!(tiers.store.all_notes().await.unwrap().is_empty());
        assert_eq!(tiers.store.policy().threshold(), 2);
    }
}
