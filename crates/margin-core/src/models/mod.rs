//! Data models for Margin

mod note;

pub use note::{
    dedup_notes, display_cmp, display_order, first_in_display_order, now_millis, Note, NoteFields,
    NoteId, NotePatch, DEFAULT_NOTE_BODY,
};
