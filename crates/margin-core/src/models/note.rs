//! Note model

use std::cmp::Ordering;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body given to notes created without content.
pub const DEFAULT_NOTE_BODY: &str = "# Type your markdown note's title here";

/// An opaque note identifier.
///
/// The note store assigns IDs; locally generated IDs use UUID v7 text so they
/// stay unique across clients.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Generate a new collision-resistant ID
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `len` characters, for compact listings
    #[must_use]
    pub fn short(&self, len: usize) -> String {
        self.0.chars().take(len).collect()
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NoteId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for NoteId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A note as held in memory and in the local cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique identifier
    pub id: NoteId,
    /// Markdown body
    pub body: String,
    /// Creation timestamp (Unix ms)
    #[serde(default)]
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    #[serde(default)]
    pub updated_at: i64,
}

impl Note {
    /// Create a note from store fields and an assigned ID
    #[must_use]
    pub fn from_fields(id: NoteId, fields: NoteFields) -> Self {
        Self {
            id,
            body: fields.body,
            created_at: fields.created_at,
            updated_at: fields.updated_at,
        }
    }

    /// The store document for this note
    #[must_use]
    pub fn fields(&self) -> NoteFields {
        NoteFields {
            body: self.body.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Apply a merge write, leaving unspecified fields untouched
    pub fn apply(&mut self, patch: &NotePatch) {
        if let Some(body) = &patch.body {
            body.clone_into(&mut self.body);
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at;
        }
    }

    /// First non-empty line with markdown heading markers stripped
    #[must_use]
    pub fn title(&self) -> String {
        let re = Regex::new(r"^\s*#{1,6}\s*").expect("Invalid regex");
        self.body
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(|line| re.replace(line, "").trim().to_string())
            .unwrap_or_default()
    }
}

/// Document shape stored in the note store (the ID lives outside it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteFields {
    pub body: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl NoteFields {
    /// Fields for a brand-new note with the default body
    #[must_use]
    pub fn new_default() -> Self {
        Self::with_body(DEFAULT_NOTE_BODY)
    }

    /// Fields for a brand-new note stamped with the current time
    #[must_use]
    pub fn with_body(body: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            body: body.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A partial update. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub body: Option<String>,
    pub updated_at: Option<i64>,
}

impl NotePatch {
    /// Body edit stamped with the current time
    #[must_use]
    pub fn body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            updated_at: Some(now_millis()),
        }
    }
}

/// Current time in Unix milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Display ordering: newest `updated_at` first, ties by ascending ID.
pub fn display_cmp(a: &Note, b: &Note) -> Ordering {
    b.updated_at
        .cmp(&a.updated_at)
        .then_with(|| a.id.cmp(&b.id))
}

/// Notes sorted for presentation.
#[must_use]
pub fn display_order(notes: &[Note]) -> Vec<Note> {
    let mut sorted = notes.to_vec();
    sorted.sort_by(display_cmp);
    sorted
}

/// The note that heads the display order, if any.
#[must_use]
pub fn first_in_display_order(notes: &[Note]) -> Option<&Note> {
    notes.iter().min_by(|a, b| display_cmp(a, b))
}

/// Collapse duplicate IDs, keeping the most recently updated entry.
///
/// Storage order of the surviving entries is preserved.
#[must_use]
pub fn dedup_notes(notes: Vec<Note>) -> Vec<Note> {
    let mut index_by_id: HashMap<NoteId, usize> = HashMap::with_capacity(notes.len());
    let mut unique: Vec<Note> = Vec::with_capacity(notes.len());

    for note in notes {
        if let Some(&index) = index_by_id.get(&note.id) {
            if note.updated_at > unique[index].updated_at {
                unique[index] = note;
            }
        } else {
            index_by_id.insert(note.id.clone(), unique.len());
            unique.push(note);
        }
    }

    unique
}
