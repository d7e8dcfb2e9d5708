//! Change fan-out.
//!
//! Every successful mutation publishes the full merged note list. Subscribers
//! get their own `broadcast::Receiver`; there is no diffing and no per-client
//! filtering. A subscriber that falls more than `capacity` publications behind
//! sees `RecvError::Lagged` with the number of revisions it missed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tiernote_core::NoteRecord;
use tokio::sync::broadcast;
use tracing::debug;

/// One publication: the complete note list as of `revision`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesChanged {
    /// Starts at 1 and increases by one per publication.
    pub revision: u64,
    pub notes: Arc<Vec<NoteRecord>>,
}

/// Broadcast channel of [`NotesChanged`] publications.
pub struct NotificationBus {
    tx: broadcast::Sender<NotesChanged>,
    revision: AtomicU64,
}

impl NotificationBus {
    /// `capacity` is the number of publications buffered per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            revision: AtomicU64::new(0),
        }
    }

    /// Stamp `notes` with the next revision and send it to every subscriber.
    ///
    /// Having no subscribers is not an error; the publication is still
    /// returned so the caller can report what went out.
    pub fn publish(&self, notes: Vec<NoteRecord>) -> NotesChanged {
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        let event = NotesChanged {
            revision,
            notes: Arc::new(notes),
        };

        match self.tx.send(event.clone()) {
            Ok(receivers) => debug!(
                revision = revision,
                notes = event.notes.len(),
                receivers = receivers,
                "Published notes"
            ),
            Err(_) => debug!(revision = revision, "No subscribers for notes"),
        }
        event
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotesChanged> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Revision of the most recent publication, 0 before the first.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }
}
