//! Suggestion queue for the current session thread.
//!
//! The queue holds upstream suggestions for one base track. A cursor walks
//! it; `-1` means nothing has been taken yet. Entries are filtered against
//! the exclusion set when the queue is populated, so everything in it was
//! unplayed at that moment.

use crate::history::PlayHistory;
use crate::track::TrackId;
use log::debug;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct SuggestionQueue {
    base_track_id: Option<TrackId>,
    queue: Vec<TrackId>,
    cursor: isize,
}

impl SuggestionQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_track_id: None,
            queue: Vec::new(),
            cursor: -1,
        }
    }

    #[must_use]
    pub fn base_track_id(&self) -> Option<&TrackId> {
        self.base_track_id.as_ref()
    }

    pub fn set_base_track_id(&mut self, id: TrackId) {
        self.base_track_id = Some(id);
    }

    #[must_use]
    pub fn cursor(&self) -> isize {
        self.cursor
    }

    #[must_use]
    pub fn entries(&self) -> &[TrackId] {
        &self.queue
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&TrackId> {
        self.queue.last()
    }

    /// Are there entries after the cursor?
    #[must_use]
    pub fn has_remaining(&self) -> bool {
        self.cursor + 1 < self.queue.len() as isize
    }

    /// Replace the queue with `suggestions` minus `exclusions`.
    ///
    /// Duplicates inside `suggestions` are dropped too. Returns the number of
    /// entries kept; when nothing survives the existing queue is left alone.
    pub fn populate(&mut self, suggestions: Vec<TrackId>, exclusions: &HashSet<TrackId>) -> usize {
        let offered = suggestions.len();
        let mut seen = HashSet::new();
        let fresh: Vec<TrackId> = suggestions
            .into_iter()
            .filter(|id| !exclusions.contains(id) && seen.insert(id.clone()))
            .collect();

        debug!("Suggestion refill kept {} of {} candidates", fresh.len(), offered);
        if fresh.is_empty() {
            return 0;
        }

        self.queue = fresh;
        self.cursor = -1;
        self.queue.len()
    }

    /// Advance past anything played within the last `min_gap` plays and
    /// return the first acceptable entry.
    ///
    /// Each entry is looked at once, so this ends after at most
    /// `len()` steps. Skipped entries stay consumed.
    pub fn next_playable(
        &mut self,
        history: &PlayHistory,
        min_gap: usize,
        last_played: Option<&TrackId>,
    ) -> Option<TrackId> {
        while self.has_remaining() {
            self.cursor += 1;
            let candidate = &self.queue[self.cursor as usize];
            if Some(candidate) == last_played || history.is_recently_played(candidate, min_gap) {
                debug!("Repeat gate skipped {candidate} at position {}", self.cursor);
                continue;
            }
            return Some(candidate.clone());
        }
        None
    }

    /// Drop the queue but remember the base track.
    pub fn clear_queue(&mut self) {
        self.queue.clear();
        self.cursor = -1;
    }

    /// Forget everything, base track included.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Queue contents for the exclusion set.
    pub fn iter(&self) -> impl Iterator<Item = &TrackId> + '_ {
        self.queue.iter()
    }
}
