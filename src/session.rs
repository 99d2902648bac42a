//! Per-listener state.
//!
//! Everything the orchestrator mutates lives here, owned by the caller and
//! passed into each operation. Separate sessions never share state.

use crate::config::AutoplayConfig;
use crate::history::PlayHistory;
use crate::language::LanguageDiversityTracker;
use crate::queue::SuggestionQueue;
use crate::track::TrackId;
use std::collections::HashSet;

/// What the playback layer is reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The current track finished on its own
    Ended,
    /// The listener picked a track
    ExplicitSelect(TrackId),
    /// The listener asked for the previous track
    Back,
}

/// Which step of the decision produced a track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    Queue,
    Refill,
    Embedding,
    LanguageYear,
    Diversity,
    Popularity,
    Selected,
    History,
}

impl std::fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Queue => "queue",
            Self::Refill => "refill",
            Self::Embedding => "embedding",
            Self::LanguageYear => "language/year",
            Self::Diversity => "diversity",
            Self::Popularity => "popularity",
            Self::Selected => "selected",
            Self::History => "history",
        };
        f.write_str(name)
    }
}

/// Result of one `decide_next` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// `None` means nothing is left to play.
    pub track: Option<TrackId>,
    pub source: Option<DecisionSource>,
    /// Base track the decision started from. Compare with
    /// [`Session::is_current`] before acting on a result that arrived late.
    pub started_from: Option<TrackId>,
}

impl Decision {
    pub(crate) fn none(started_from: Option<TrackId>) -> Self {
        Self {
            track: None,
            source: None,
            started_from,
        }
    }

    pub(crate) fn some(track: TrackId, source: DecisionSource, started_from: Option<TrackId>) -> Self {
        Self {
            track: Some(track),
            source: Some(source),
            started_from,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) history: PlayHistory,
    pub(crate) suggestions: SuggestionQueue,
    pub(crate) languages: LanguageDiversityTracker,
    pub(crate) last_played: Option<TrackId>,
}

impl Session {
    #[must_use]
    pub fn new(config: &AutoplayConfig) -> Self {
        Self {
            history: PlayHistory::new(config.max_history_size),
            suggestions: SuggestionQueue::new(),
            languages: LanguageDiversityTracker::new(
                config.language_thresholds.clone(),
                config.default_language_threshold,
            ),
            last_played: None,
        }
    }

    #[must_use]
    pub fn history(&self) -> &PlayHistory {
        &self.history
    }

    #[must_use]
    pub fn suggestions(&self) -> &SuggestionQueue {
        &self.suggestions
    }

    #[must_use]
    pub fn languages(&self) -> &LanguageDiversityTracker {
        &self.languages
    }

    #[must_use]
    pub fn last_played(&self) -> Option<&TrackId> {
        self.last_played.as_ref()
    }

    #[must_use]
    pub fn base_track_id(&self) -> Option<&TrackId> {
        self.suggestions.base_track_id()
    }

    /// Whether `decision` was computed against the state we still have.
    #[must_use]
    pub fn is_current(&self, decision: &Decision) -> bool {
        decision.started_from.as_ref() == self.base_track_id()
    }

    /// Last-played id, queue contents and the whole history.
    #[must_use]
    pub fn exclusion_set(&self) -> HashSet<TrackId> {
        let mut excluded = self.history.exclusion_snapshot();
        excluded.extend(self.suggestions.iter().cloned());
        if let Some(last) = &self.last_played {
            excluded.insert(last.clone());
        }
        excluded
    }

    /// Loop-breaker used when every fallback tier came up empty.
    pub(crate) fn clear_all(&mut self) {
        self.history.clear();
        self.suggestions.reset();
    }
}
