//! Identity types for note records

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Note identifier. Opaque on the wire; generated as a UUIDv7 string so ids
/// sort by creation time and never collide across tiers.
pub type NoteId = String;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a fresh note id.
pub fn new_note_id() -> NoteId {
    Uuid::now_v7().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_new_note_ids_are_distinct() {
        let ids: HashSet<NoteId> = (0..1000).map(|_| new_note_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_new_note_id_is_uuid() {
        let id = new_note_id();
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
