//! Key-release emulation for terminals that only report presses
//!
//! Auto-repeat keeps refreshing a held key; once a key has gone quiet for
//! the timeout it counts as released.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::keymap::NoteIdentity;

/// Quiet time after which a key counts as released. Must exceed the
/// terminal's initial auto-repeat delay, typically 500-660 ms.
pub const RELEASE_TIMEOUT: Duration = Duration::from_millis(700);

#[derive(Debug)]
pub struct HeldKeys {
    timeout: Duration,
    last_seen: HashMap<NoteIdentity, Instant>,
}

impl HeldKeys {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_seen: HashMap::new(),
        }
    }

    /// Record a press or repeat. Returns true for a fresh press.
    pub fn press(&mut self, note: NoteIdentity, now: Instant) -> bool {
        self.last_seen.insert(note, now).is_none()
    }

    /// Forget a key released by other means
    pub fn release(&mut self, note: NoteIdentity) -> bool {
        self.last_seen.remove(&note).is_some()
    }

    /// Remove and return every key quiet for longer than the timeout
    pub fn expired(&mut self, now: Instant) -> Vec<NoteIdentity> {
        let timeout = self.timeout;
        let mut released: Vec<NoteIdentity> = self
            .last_seen
            .iter()
            .filter(|(_, seen)| now.saturating_duration_since(**seen) >= timeout)
            .map(|(note, _)| *note)
            .collect();
        released.sort();
        for note in &released {
            self.last_seen.remove(note);
        }
        released
    }

    pub fn clear(&mut self) {
        self.last_seen.clear();
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }
}

impl Default for HeldKeys {
    fn default() -> Self {
        Self::new(RELEASE_TIMEOUT)
    }
}
