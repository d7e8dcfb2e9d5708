//! In-memory cache tier with failure injection.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tiernote_core::{NoteError, NoteRecord, NoteResult};

use crate::tier::CacheTier;

/// Process-local cache tier.
///
/// `load` yields to the scheduler before reading, so unsynchronized
/// read-modify-write sequences interleave the same way they would against a
/// networked store.
#[derive(Debug)]
pub struct InMemoryCacheTier {
    records: Mutex<Vec<NoteRecord>>,
    available: AtomicBool,
    /// Successful stores allowed before stores start failing; negative disables.
    stores_until_failure: AtomicI64,
    stores: AtomicUsize,
}

impl Default for InMemoryCacheTier {
    fn default() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
            stores_until_failure: AtomicI64::new(-1),
            stores: AtomicUsize::new(0),
        }
    }
}

impl InMemoryCacheTier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the store going away (or coming back). Coming back also
    /// clears any pending [`fail_store_after`](Self::fail_store_after).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
        if available {
            self.stores_until_failure.store(-1, Ordering::SeqCst);
        }
    }

    /// Let the next `successes` stores through, then fail every store until
    /// [`set_available`](Self::set_available) or this method is called again.
    pub fn fail_store_after(&self, successes: usize) {
        self.stores_until_failure
            .store(successes as i64, Ordering::SeqCst);
    }

    /// Number of successful stores so far.
    pub fn store_count(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }

    /// Current contents without going through the async API.
    pub fn snapshot(&self) -> Vec<NoteRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    fn check_available(&self) -> NoteResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(NoteError::cache_unavailable("in-memory cache marked unavailable"))
        }
    }

    fn take_store_permit(&self) -> NoteResult<()> {
        let remaining = self.stores_until_failure.load(Ordering::SeqCst);
        if remaining == 0 {
            return Err(NoteError::cache_unavailable("injected store failure"));
        }
        if remaining > 0 {
            self.stores_until_failure.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[async_trait]
impl CacheTier for InMemoryCacheTier {
    async fn load(&self) -> NoteResult<Vec<NoteRecord>> {
        tokio::task::yield_now().await;
        self.check_available()?;
        let records = self
            .records
            .lock()
            .map_err(|_| NoteError::cache_unavailable("cache lock poisoned"))?;
        Ok(records.clone())
    }

    async fn store(&self, records: &[NoteRecord]) -> NoteResult<()> {
        self.check_available()?;
        self.take_store_permit()?;
        let mut current = self
            .records
            .lock()
            .map_err(|_| NoteError::cache_unavailable("cache lock poisoned"))?;
        *current = records.to_vec();
        self.stores.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
