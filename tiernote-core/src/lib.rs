//! tiernote Core - Entity Types
//!
//! Pure data structures shared by every other crate in the workspace:
//! the note record, identity helpers, and the error taxonomy.

pub mod error;
pub mod identity;
pub mod note;

pub use error::{NoteError, NoteResult, Tier};
pub use identity::{new_note_id, NoteId, Timestamp};
pub use note::NoteRecord;
