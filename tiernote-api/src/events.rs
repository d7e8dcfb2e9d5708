//! WebSocket Event Types
//!
//! Frames exchanged over `/ws`. Every frame is a JSON text message with a
//! `type` discriminator.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tiernote_core::NoteRecord;
use tiernote_storage::NotesChanged;

/// Which mutation an acknowledgement refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationOp {
    Add,
    Delete,
}

impl MutationOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationOp::Add => "add",
            MutationOp::Delete => "delete",
        }
    }
}

/// Frames sent by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Create a note with the given text.
    Add {
        text: String,
        #[serde(default, rename = "requestId", skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// Delete the note with the given id, wherever it lives.
    Delete {
        id: String,
        #[serde(default, rename = "requestId", skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
}

impl ClientMessage {
    pub fn op(&self) -> MutationOp {
        match self {
            ClientMessage::Add { .. } => MutationOp::Add,
            ClientMessage::Delete { .. } => MutationOp::Delete,
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            ClientMessage::Add { request_id, .. } | ClientMessage::Delete { request_id, .. } => {
                request_id.as_deref()
            }
        }
    }
}

/// Frames sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WsEvent {
    // ========================================================================
    // CONNECTION EVENTS
    // ========================================================================
    /// Sent once when the socket opens.
    Connected,

    /// Malformed client frame, or the client fell behind the broadcast.
    Error {
        message: String,
    },

    // ========================================================================
    // NOTE EVENTS
    // ========================================================================
    /// The full note list after a mutation, sent to every client.
    NotesChanged {
        revision: u64,
        notes: Arc<Vec<NoteRecord>>,
    },

    /// Outcome of one client's own mutation, sent only to that client.
    Ack {
        #[serde(rename = "requestId")]
        request_id: Option<String>,
        op: MutationOp,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        error: Option<String>,
    },
}

impl WsEvent {
    /// Get the event type as a string (for logging/filtering).
    pub fn event_type(&self) -> &'static str {
        match self {
            WsEvent::Connected => "connected",
            WsEvent::Error { .. } => "error",
            WsEvent::NotesChanged { .. } => "notesChanged",
            WsEvent::Ack { .. } => "ack",
        }
    }
}

impl From<NotesChanged> for WsEvent {
    fn from(changed: NotesChanged) -> Self {
        WsEvent::NotesChanged {
            revision: changed.revision,
            notes: changed.notes,
        }
    }
}
