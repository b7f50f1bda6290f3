//! Editable text buffer with a trailing-edge debounce.
//!
//! Keystrokes land here instead of on the committed note body. A flush is
//! only offered once the buffer has been quiet for the debounce period, and
//! only for the note the edits were typed into.

use std::time::Duration;

use tokio::time::Instant;

use crate::models::{Note, NoteId};

/// Default quiet period before a buffered edit is written
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// A buffered edit ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flush {
    pub note_id: NoteId,
    pub text: String,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingTimer {
    generation: u64,
    deadline: Instant,
}

/// Buffer state for the currently selected note.
#[derive(Debug)]
pub struct EditBuffer {
    note_id: Option<NoteId>,
    text: String,
    generation: u64,
    /// Generation whose text matches the committed body
    written: u64,
    pending: Option<PendingTimer>,
    debounce: Duration,
}

impl EditBuffer {
    pub const fn new(debounce: Duration) -> Self {
        Self {
            note_id: None,
            text: String::new(),
            generation: 0,
            written: 0,
            pending: None,
            debounce,
        }
    }

    /// Point the buffer at `note`, replacing its text verbatim.
    ///
    /// Any pending timer belongs to the previous note and is cancelled.
    pub fn load(&mut self, note: Option<&Note>) {
        self.generation += 1;
        self.written = self.generation;
        self.pending = None;
        self.note_id = note.map(|note| note.id.clone());
        self.text = note.map(|note| note.body.clone()).unwrap_or_default();
    }

    /// Record a keystroke-level mutation and restart the timer
    pub fn edit(&mut self, text: impl Into<String>, now: Instant) {
        self.text = text.into();
        self.generation += 1;
        self.pending = self.note_id.as_ref().map(|_| PendingTimer {
            generation: self.generation,
            deadline: now + self.debounce,
        });
    }

    /// When the pending timer fires, if one is armed
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|pending| pending.deadline)
    }

    /// Take the flush whose timer has fired by `now`.
    ///
    /// Disarms the timer. A timer from an older generation never yields a
    /// flush.
    pub fn take_due(&mut self, now: Instant) -> Option<Flush> {
        let pending = self.pending?;
        if pending.deadline > now {
            return None;
        }
        self.pending = None;
        if pending.generation != self.generation {
            return None;
        }
        self.flush_for_current(pending.generation)
    }

    /// Disarm the timer and hand out unwritten text for an immediate write.
    ///
    /// A buffer with no edits since it was loaded or last written yields
    /// nothing.
    pub fn take_current(&mut self) -> Option<Flush> {
        self.pending = None;
        if !self.is_dirty() {
            return None;
        }
        self.flush_for_current(self.generation)
    }

    /// Record that the flush taken at `generation` reached the store.
    ///
    /// Later edits keep the buffer dirty.
    pub fn mark_written(&mut self, generation: u64) {
        if generation == self.generation {
            self.written = generation;
        }
    }

    /// Restart the timer after the flush taken at `generation` failed to
    /// reach the store. Ignored once newer edits or another note took over.
    pub fn rearm(&mut self, generation: u64, now: Instant) {
        if generation != self.generation || !self.is_dirty() || self.note_id.is_none() {
            return;
        }
        self.pending = Some(PendingTimer {
            generation,
            deadline: now + self.debounce,
        });
    }

    /// Whether the text holds edits that were never written
    pub const fn is_dirty(&self) -> bool {
        self.written != self.generation
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn note_id(&self) -> Option<&NoteId> {
        self.note_id.as_ref()
    }

    pub const fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn flush_for_current(&self, generation: u64) -> Option<Flush> {
        self.note_id.as_ref().map(|note_id| Flush {
            note_id: note_id.clone(),
            text: self.text.clone(),
            generation,
        })
    }
}

impl Default for EditBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: &str, body: &str) -> Note {
        Note {
            id: NoteId::from(id),
            body: body.to_string(),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn load_replaces_text_verbatim() {
        let mut buffer = EditBuffer::default();
        buffer.load(Some(&note("a", "# A")));
        assert_eq!(buffer.text(), "# A");
        assert_eq!(buffer.note_id().map(NoteId::as_str), Some("a"));

        buffer.load(None);
        assert_eq!(buffer.text(), "");
        assert!(buffer.note_id().is_none());
    }

    #[test]
    fn nothing_due_before_quiet_period() {
        let start = Instant::now();
        let mut buffer = EditBuffer::new(ms(500));
        buffer.load(Some(&note("a", "")));
        buffer.edit("x", start);

        assert_eq!(buffer.deadline(), Some(start + ms(500)));
        assert!(buffer.take_due(start + ms(499)).is_none());
        assert!(buffer.has_pending());
    }

    #[test]
    fn rapid_edits_coalesce_into_last_value() {
        let start = Instant::now();
        let mut buffer = EditBuffer::new(ms(500));
        buffer.load(Some(&note("a", "")));
        buffer.edit("h", start);
        buffer.edit("he", start + ms(100));
        buffer.edit("hey", start + ms(300));

        assert!(buffer.take_due(start + ms(600)).is_none());
        let flush = buffer.take_due(start + ms(800)).unwrap();
        assert_eq!(flush.text, "hey");
        assert_eq!(flush.note_id.as_str(), "a");
        assert!(buffer.take_due(start + ms(5000)).is_none());
    }

    #[test]
    fn selection_change_cancels_timer() {
        let start = Instant::now();
        let mut buffer = EditBuffer::new(ms(500));
        buffer.load(Some(&note("a", "")));
        buffer.edit("typed into a", start);
        buffer.load(Some(&note("b", "b body")));

        assert!(!buffer.has_pending());
        assert!(buffer.take_due(start + ms(1000)).is_none());
        assert_eq!(buffer.text(), "b body");
    }

    #[test]
    fn edit_without_selection_arms_nothing() {
        let mut buffer = EditBuffer::default();
        buffer.edit("orphan", Instant::now());
        assert!(!buffer.has_pending());
        assert!(buffer.take_current().is_none());
    }

    #[test]
    fn clean_buffer_offers_nothing() {
        let mut buffer = EditBuffer::default();
        buffer.load(Some(&note("a", "stale")));
        assert!(!buffer.is_dirty());
        assert!(buffer.take_current().is_none());
    }

    #[test]
    fn mark_written_ignores_older_generations() {
        let start = Instant::now();
        let mut buffer = EditBuffer::default();
        buffer.load(Some(&note("a", "")));
        buffer.edit("first", start);
        let flush = buffer.take_current().unwrap();
        buffer.edit("second", start + ms(10));

        buffer.mark_written(flush.generation);
        assert!(buffer.is_dirty());
        let flush = buffer.take_current().unwrap();
        assert_eq!(flush.text, "second");

        buffer.mark_written(flush.generation);
        assert!(!buffer.is_dirty());
    }

    #[test]
    fn failed_write_can_be_retried() {
        let mut buffer = EditBuffer::default();
        buffer.load(Some(&note("a", "")));
        buffer.edit("retry me", Instant::now());
        assert!(buffer.take_current().is_some());
        let again = buffer.take_current().unwrap();
        assert_eq!(again.text, "retry me");
    }

    #[test]
    fn failed_flush_rearms_timer() {
        let start = Instant::now();
        let mut buffer = EditBuffer::new(ms(500));
        buffer.load(Some(&note("a", "")));
        buffer.edit("unsent", start);
        let flush = buffer.take_due(start + ms(500)).unwrap();
        assert!(!buffer.has_pending());

        buffer.rearm(flush.generation, start + ms(600));

        assert_eq!(buffer.deadline(), Some(start + ms(1100)));
        assert_eq!(buffer.take_due(start + ms(1100)).unwrap().text, "unsent");
    }

    #[test]
    fn rearm_ignores_superseded_flush() {
        let start = Instant::now();
        let mut buffer = EditBuffer::new(ms(500));
        buffer.load(Some(&note("a", "")));
        buffer.edit("first", start);
        let stale = buffer.take_current().unwrap();
        buffer.load(Some(&note("b", "B")));

        buffer.rearm(stale.generation, start);

        assert!(!buffer.has_pending());
    }

    #[test]
    fn take_current_ignores_deadline() {
        let mut buffer = EditBuffer::default();
        buffer.load(Some(&note("a", "")));
        buffer.edit("now", Instant::now());
        let flush = buffer.take_current().unwrap();
        assert_eq!(flush.text, "now");
        assert!(!buffer.has_pending());
    }
}
