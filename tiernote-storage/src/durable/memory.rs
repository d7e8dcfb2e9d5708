//! In-memory durable tier with failure injection.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use tiernote_core::{NoteError, NoteRecord, NoteResult};

use crate::tier::DurableTier;

/// Process-local durable tier keeping records in insertion order.
#[derive(Debug)]
pub struct InMemoryDurableTier {
    records: RwLock<Vec<NoteRecord>>,
    available: AtomicBool,
    writes: AtomicUsize,
}

impl Default for InMemoryDurableTier {
    fn default() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            available: AtomicBool::new(true),
            writes: AtomicUsize::new(0),
        }
    }
}

impl InMemoryDurableTier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the store going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of write operations (`insert_many` with input, `delete_by_id`).
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Current contents without going through the async API.
    pub fn snapshot(&self) -> Vec<NoteRecord> {
        self.records
            .read()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    fn check_available(&self) -> NoteResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(NoteError::durable_unavailable(
                "in-memory durable tier marked unavailable",
            ))
        }
    }
}

#[async_trait]
impl DurableTier for InMemoryDurableTier {
    async fn scan_all(&self) -> NoteResult<Vec<NoteRecord>> {
        self.check_available()?;
        let records = self
            .records
            .read()
            .map_err(|_| NoteError::durable_unavailable("durable lock poisoned"))?;
        Ok(records.clone())
    }

    async fn insert_many(&self, records: &[NoteRecord]) -> NoteResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        self.check_available()?;
        let mut current = self
            .records
            .write()
            .map_err(|_| NoteError::durable_unavailable("durable lock poisoned"))?;
        for record in records {
            if !current.iter().any(|existing| existing.id == record.id) {
                current.push(record.clone());
            }
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> NoteResult<()> {
        self.check_available()?;
        let mut current = self
            .records
            .write()
            .map_err(|_| NoteError::durable_unavailable("durable lock poisoned"))?;
        current.retain(|record| record.id != id);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn ping(&self) -> NoteResult<()> {
        self.check_available()
    }
}
