//! Bounded play history with repeat gating.

use crate::error::HistoryError;
use crate::track::TrackId;
use std::collections::{HashSet, VecDeque};

/// Ordered record of what has played, oldest first.
///
/// Invariants: never longer than its capacity, and no two adjacent entries
/// are equal.
#[derive(Debug, Clone)]
pub struct PlayHistory {
    entries: VecDeque<TrackId>,
    capacity: usize,
}

impl PlayHistory {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(256)),
            capacity,
        }
    }

    /// Record a play. Replaying the current tail is a no-op.
    pub fn append(&mut self, id: TrackId) {
        if self.entries.back() == Some(&id) {
            return;
        }
        self.entries.push_back(id);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// True when `id` occurs within the last `min_gap` entries.
    #[must_use]
    pub fn is_recently_played(&self, id: &TrackId, min_gap: usize) -> bool {
        // Scan from the tail: the most recent occurrence decides.
        self.entries
            .iter()
            .rev()
            .take(min_gap)
            .any(|entry| entry == id)
    }

    #[must_use]
    pub fn exclusion_snapshot(&self) -> HashSet<TrackId> {
        self.entries.iter().cloned().collect()
    }

    /// Remove and return the most recent entry.
    ///
    /// # Errors
    ///
    /// `EmptyHistory` when nothing has been played.
    pub fn pop_last(&mut self) -> Result<TrackId, HistoryError> {
        self.entries.pop_back().ok_or(HistoryError::EmptyHistory)
    }

    #[must_use]
    pub fn last(&self) -> Option<&TrackId> {
        self.entries.back()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackId> + '_ {
        self.entries.iter()
    }
}
