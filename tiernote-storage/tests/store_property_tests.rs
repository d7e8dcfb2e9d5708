//! Property-Based Tests for the Tiered Note Store
//!
//! **Property 1: Id Uniqueness**
//! Every added note gets an id distinct from all others.
//!
//! **Property 2: Merge Correctness**
//! After any sequential mix of adds and deletes, `all_notes()` holds exactly
//! the live notes, durable-tier notes first, and each publication equals the
//! merged read right after its mutation.
//!
//! **Property 3: Bounded Cache**
//! The cache never holds more than the threshold between mutations.

use std::collections::HashSet;

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use tiernote_storage::{Eviction, MutationKind};
use tiernote_test_utils::assertions::ids;
use tiernote_test_utils::fixtures::{added, memory_store, UNKNOWN_ID};
use tiernote_test_utils::generators::{arb_note_ops, arb_note_text, arb_threshold, NoteOp};
use tiernote_test_utils::NoteId;
use tokio::runtime::Runtime;

fn test_runtime() -> Result<Runtime, TestCaseError> {
    Runtime::new().map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

/// Reference model: which live ids sit in which tier, in tier order.
#[derive(Debug, Default)]
struct Model {
    durable: Vec<NoteId>,
    cache: Vec<NoteId>,
}

impl Model {
    fn live(&self) -> Vec<NoteId> {
        self.durable.iter().chain(self.cache.iter()).cloned().collect()
    }

    fn add(&mut self, id: NoteId, threshold: usize) -> bool {
        self.cache.push(id);
        if self.cache.len() > threshold {
            self.durable.append(&mut self.cache);
            true
        } else {
            false
        }
    }

    fn delete(&mut self, id: &str) {
        if let Some(index) = self.cache.iter().position(|cached| cached == id) {
            self.cache.remove(index);
        } else {
            self.durable.retain(|stored| stored != id);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_added_ids_are_unique(
        texts in prop::collection::vec(arb_note_text(), 1..60),
        threshold in arb_threshold(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let tiers = memory_store(threshold);
            let mut seen = HashSet::new();
            for text in texts {
                let mutation = tiers.store.add(text.clone()).await
                    .map_err(|e| TestCaseError::fail(format!("add failed: {}", e)))?;
                let record = added(&mutation);
                prop_assert_eq!(&record.text, &text);
                prop_assert!(seen.insert(record.id.clone()), "duplicate id {}", record.id);
            }
            Ok(())
        })?;
    }

    #[test]
    fn prop_merged_read_matches_model(
        ops in arb_note_ops(80),
        threshold in arb_threshold(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let tiers = memory_store(threshold);
            let mut rx = tiers.bus().subscribe();
            let mut model = Model::default();

            for op in ops {
                let mutation = match op {
                    NoteOp::Add(text) => {
                        let m = tiers.store.add(text).await
                            .map_err(|e| TestCaseError::fail(format!("add failed: {}", e)))?;
                        let evicted = model.add(added(&m).id.clone(), threshold);
                        prop_assert_eq!(
                            matches!(m.eviction, Some(Eviction::Evicted { .. })),
                            evicted
                        );
                        m
                    }
                    NoteOp::DeleteExisting(index) => {
                        let live = model.live();
                        let id = if live.is_empty() {
                            UNKNOWN_ID.to_string()
                        } else {
                            live[index % live.len()].clone()
                        };
                        model.delete(&id);
                        tiers.store.delete(&id).await
                            .map_err(|e| TestCaseError::fail(format!("delete failed: {}", e)))?
                    }
                    NoteOp::DeleteUnknown => {
                        tiers.store.delete(UNKNOWN_ID).await
                            .map_err(|e| TestCaseError::fail(format!("delete failed: {}", e)))?
                    }
                };

                let merged = tiers.store.all_notes().await
                    .map_err(|e| TestCaseError::fail(format!("read failed: {}", e)))?;
                prop_assert_eq!(ids(&merged), model.live());
                prop_assert_eq!(ids(&tiers.cache.snapshot()), model.cache.clone());
                prop_assert_eq!(ids(&tiers.durable.snapshot()), model.durable.clone());
                prop_assert!(tiers.cache.snapshot().len() <= threshold);

                let received = rx.try_recv()
                    .map_err(|e| TestCaseError::fail(format!("missing publication: {}", e)))?;
                prop_assert_eq!(&received, &mutation.published);
                prop_assert_eq!(&*received.notes, &merged);

                if let MutationKind::Deleted { id, .. } = &mutation.kind {
                    prop_assert!(!ids(&merged).contains(id));
                }
            }
            Ok(())
        })?;
    }
}
