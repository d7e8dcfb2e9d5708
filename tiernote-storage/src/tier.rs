//! Tier traits.
//!
//! Both traits are object safe so the store can hold `Arc<dyn CacheTier>` and
//! `Arc<dyn DurableTier>` and swap backends at startup (LMDB/PostgreSQL in the
//! server, in-memory in tests).

use async_trait::async_trait;
use tiernote_core::{NoteRecord, NoteResult};

/// The fast, size-bounded tier.
///
/// The whole collection sits under a single key and is always read and
/// written wholesale. Implementations only provide [`load`](Self::load) and
/// [`store`](Self::store); the read-modify-write helpers are built on top of
/// them and are NOT atomic. Callers that mutate concurrently must serialize
/// access themselves (see [`NoteStore`](crate::NoteStore)).
#[async_trait]
pub trait CacheTier: Send + Sync {
    /// Fetch and deserialize the collection. Missing key means empty.
    async fn load(&self) -> NoteResult<Vec<NoteRecord>>;

    /// Serialize and overwrite the whole collection in one write.
    async fn store(&self, records: &[NoteRecord]) -> NoteResult<()>;

    /// Append one record and return the new length.
    async fn append(&self, record: NoteRecord) -> NoteResult<usize> {
        let mut records = self.load().await?;
        records.push(record);
        self.store(&records).await?;
        Ok(records.len())
    }

    /// Remove the record with `id`, persisting only when something was removed.
    async fn remove_by_id(&self, id: &str) -> NoteResult<bool> {
        let mut records = self.load().await?;
        match records.iter().position(|record| record.id == id) {
            Some(index) => {
                records.remove(index);
                self.store(&records).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Liveness probe.
    async fn ping(&self) -> NoteResult<()> {
        self.load().await.map(|_| ())
    }
}

/// The unbounded persistent tier, addressed per record.
#[async_trait]
pub trait DurableTier: Send + Sync {
    /// Every record, in insertion order. No pagination.
    async fn scan_all(&self) -> NoteResult<Vec<NoteRecord>>;

    /// Bulk insert. Empty input must not touch the store. Records whose id is
    /// already present are skipped, which makes a retried migration harmless.
    async fn insert_many(&self, records: &[NoteRecord]) -> NoteResult<()>;

    /// Delete one record. Unknown ids are a silent no-op.
    async fn delete_by_id(&self, id: &str) -> NoteResult<()>;

    /// Liveness probe.
    async fn ping(&self) -> NoteResult<()>;
}
