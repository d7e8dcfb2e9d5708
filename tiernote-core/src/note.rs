//! The note record flowing through both tiers.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::identity::{new_note_id, NoteId, Timestamp};

/// A single user note.
///
/// The same JSON shape is used in the cache tier, the durable tier, the HTTP
/// read path and the real-time channel:
/// `{"id": "...", "text": "...", "completed": false, "createdAt": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRecord {
    /// Server-generated id, unique across both tiers.
    pub id: NoteId,
    /// User text, stored as received. Empty text is accepted.
    pub text: String,
    /// Always `false` at creation; nothing currently sets it.
    #[serde(default)]
    pub completed: bool,
    /// Assigned by the server at creation.
    pub created_at: Timestamp,
}

impl NoteRecord {
    /// Build a new record with a fresh id and the current time.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: new_note_id(),
            text: text.into(),
            completed: false,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_record_defaults() {
        let note = NoteRecord::new("buy milk");
        assert_eq!(note.text, "buy milk");
        assert!(!note.completed);
        assert!(!note.id.is_empty());
    }

    #[test]
    fn test_wire_field_names() -> Result<(), serde_json::Error> {
        let note = NoteRecord::new("call mom");
        let value = serde_json::to_value(&note)?;

        assert!(value.get("id").is_some());
        assert!(value.get("text").is_some());
        assert!(value.get("completed").is_some());
        assert!(value.get("createdAt").is_some());
        assert!(value.get("created_at").is_none());
        Ok(())
    }

    #[test]
    fn test_missing_completed_defaults_to_false() -> Result<(), serde_json::Error> {
        let note: NoteRecord = serde_json::from_str(
            r#"{"id":"1700000000000","text":"legacy","createdAt":"2024-01-01T00:00:00Z"}"#,
        )?;
        assert!(!note.completed);
        assert_eq!(note.id, "1700000000000");
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_any_text_is_accepted_verbatim(text in ".*") {
            let note = NoteRecord::new(text.clone());
            prop_assert_eq!(note.text, text);
            prop_assert!(!note.completed);
        }
    }
}
