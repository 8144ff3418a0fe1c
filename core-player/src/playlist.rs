//! # Playlist State Store
//!
//! The ordered playlist and its cursor. The store is purely synchronous
//! state; asynchronous work (resolution, playback) happens in the engine,
//! which is why late patches against removed indices must be silent no-ops:
//! a patch landing after its entry is gone is expected, not a bug.

use tracing::trace;

use crate::models::{Track, TrackPatch};

/// What a removal did to the cursor.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoveOutcome {
    /// Removed ahead of the cursor (or with no cursor); nothing to do.
    CursorUnchanged,
    /// Removed behind the cursor; it was decremented to keep pointing at the
    /// same entry.
    CursorShifted { index: usize },
    /// The playlist emptied; cursor and playback reset.
    BecameEmpty,
    /// The current entry was removed; the cursor clamped to a survivor.
    /// `autoplay_url` is set when the survivor has a resolved source and
    /// playback should continue into it.
    CursorClamped {
        index: usize,
        autoplay_url: Option<String>,
    },
}

/// Ordered playlist with an optional cursor.
///
/// Duplicates of the same track id are allowed; the cursor is positional,
/// never identity-based.
#[derive(Debug, Default)]
pub struct PlaylistStore {
    items: Vec<Track>,
    cursor: Option<usize>,
}

impl PlaylistStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.items.get(index)
    }

    /// The entry under the cursor, if any.
    pub fn current(&self) -> Option<&Track> {
        self.cursor.and_then(|i| self.items.get(i))
    }

    /// Clone of the full playlist, for subscribers.
    pub fn snapshot(&self) -> Vec<Track> {
        self.items.clone()
    }

    /// Append an entry (typically an unresolved placeholder) and return its
    /// index. The cursor does not move; callers decide whether to select it.
    pub fn append_placeholder(&mut self, track: Track) -> usize {
        self.items.push(track);
        self.items.len() - 1
    }

    /// Shallow-merge a patch into the entry at `index`.
    ///
    /// Out-of-range indices are silent no-ops: the entry a late patch was
    /// aimed at may have been removed while its resolution was in flight.
    pub fn patch(&mut self, index: usize, patch: TrackPatch) {
        match self.items.get_mut(index) {
            Some(track) => patch.apply(track),
            None => trace!(index, "stale patch against removed entry ignored"),
        }
    }

    /// Point the cursor at an entry without touching playback. Out-of-range
    /// indices are ignored.
    pub fn set_cursor(&mut self, index: usize) {
        if index < self.items.len() {
            self.cursor = Some(index);
        }
    }

    pub fn clear_cursor(&mut self) {
        self.cursor = None;
    }

    /// Remove the entry at `index`, maintaining the cursor laws.
    ///
    /// Out-of-range removal returns `CursorUnchanged` without touching the
    /// playlist.
    pub fn remove(&mut self, index: usize) -> RemoveOutcome {
        if index >= self.items.len() {
            return RemoveOutcome::CursorUnchanged;
        }
        self.items.remove(index);

        let Some(cursor) = self.cursor else {
            return RemoveOutcome::CursorUnchanged;
        };

        if index < cursor {
            let shifted = cursor - 1;
            self.cursor = Some(shifted);
            return RemoveOutcome::CursorShifted { index: shifted };
        }
        if index > cursor {
            return RemoveOutcome::CursorUnchanged;
        }

        // Removed the current entry.
        if self.items.is_empty() {
            self.cursor = None;
            return RemoveOutcome::BecameEmpty;
        }
        let clamped = cursor.min(self.items.len() - 1);
        self.cursor = Some(clamped);
        RemoveOutcome::CursorClamped {
            index: clamped,
            autoplay_url: self.items[clamped].audio_url.clone(),
        }
    }
}
