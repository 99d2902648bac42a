//! Decides what plays next.
//!
//! On every track end the orchestrator walks the same protocol:
//!
//! 1. Take the next queued suggestion that passes the repeat gate.
//! 2. Queue exhausted: pick a base track (last queue entry, last played,
//!    history tail, remembered base).
//! 3. Refill the queue from upstream suggestions for that base, minus the
//!    exclusion set, and gate again.
//! 4. Otherwise run the [fallback cascade](crate::fallback).
//! 5. If even that is empty, clear history and suggestion state and report
//!    that nothing is left to play.
//!
//! The orchestrator itself is immutable; all per-listener state is in the
//! [`Session`] the caller passes in.

use crate::config::AutoplayConfig;
use crate::embedding::EmbeddingIndex;
use crate::error::FetchError;
use crate::fallback::{FallbackContext, FallbackSearchStrategy};
use crate::provider::Collaborators;
use crate::session::{Decision, DecisionSource, PlaybackEvent, Session};
use crate::track::{Track, TrackId};
use chrono::Datelike;
use log::{debug, info, warn};
use rand::Rng;

pub struct RecommendationOrchestrator<'a> {
    config: AutoplayConfig,
    index: EmbeddingIndex,
    collaborators: Collaborators<'a>,
    /// Pinned calendar year; `None` reads the clock on every decision.
    current_year: Option<i32>,
}

impl<'a> RecommendationOrchestrator<'a> {
    pub fn new(config: AutoplayConfig, index: EmbeddingIndex, collaborators: Collaborators<'a>) -> Self {
        Self {
            config,
            index,
            collaborators,
            current_year: None,
        }
    }

    /// Pin the calendar year used by the year-based tiers.
    #[must_use]
    pub fn with_current_year(self, current_year: i32) -> Self {
        Self {
            current_year: Some(current_year),
            ..self
        }
    }

    /// Calendar year the year-based tiers measure against.
    #[must_use]
    pub fn current_year(&self) -> i32 {
        self.current_year
            .unwrap_or_else(|| chrono::Local::now().year())
    }

    #[must_use]
    pub fn config(&self) -> &AutoplayConfig {
        &self.config
    }

    #[must_use]
    pub fn index(&self) -> &EmbeddingIndex {
        &self.index
    }

    #[must_use]
    pub fn new_session(&self) -> Session {
        Session::new(&self.config)
    }

    /// React to a playback event.
    ///
    /// At most one call per session may be in flight; `&mut Session`
    /// enforces that.
    pub fn decide_next<R: Rng + ?Sized>(
        &self,
        session: &mut Session,
        event: PlaybackEvent,
        rng: &mut R,
    ) -> Decision {
        match event {
            PlaybackEvent::Ended => self.continue_playback(session, rng),
            PlaybackEvent::ExplicitSelect(id) => {
                info!("Listener selected {id}, starting a new thread");
                session.suggestions.clear_queue();
                session.suggestions.set_base_track_id(id.clone());
                Decision::some(id.clone(), DecisionSource::Selected, Some(id))
            }
            PlaybackEvent::Back => {
                let started_from = session.base_track_id().cloned();
                match self.go_back(session) {
                    Some(id) => Decision::some(id, DecisionSource::History, started_from),
                    None => Decision::none(started_from),
                }
            }
        }
    }

    /// Called by the playback layer once `id` actually starts playing.
    pub fn record_played(&self, session: &mut Session, id: TrackId) {
        // Fetch before touching the session so no mutation straddles the call.
        let language = match self.collaborators.metadata.fetch(&id) {
            Ok(track) => Some(track.language),
            Err(e) => {
                debug!("Language counters unchanged for {id}: {e}");
                None
            }
        };

        session.history.append(id.clone());
        if let Some(language) = language {
            session.languages.record(&language);
            if let Some((streaking, run)) = session.languages.current_streak() {
                debug!("{streaking} streak at {run}");
            }
        }
        session.last_played = Some(id.clone());
        session.suggestions.set_base_track_id(id);
    }

    /// Step back to the track before the current one.
    ///
    /// The history tail is what is playing now, so at least two entries are
    /// needed. Both are removed; the caller plays the returned track and
    /// records it again.
    pub fn go_back(&self, session: &mut Session) -> Option<TrackId> {
        if session.history.len() < 2 {
            debug!("Nothing to go back to");
            return None;
        }
        let current = session.history.pop_last().ok()?;
        let previous = session.history.pop_last().ok()?;
        debug!("Going back from {current} to {previous}");
        Some(previous)
    }

    fn continue_playback<R: Rng + ?Sized>(&self, session: &mut Session, rng: &mut R) -> Decision {
        let started_from = session.base_track_id().cloned();
        let last_played = session.last_played.clone();
        let min_gap = self.config.min_history_before_repeat;

        if let Some(id) = session
            .suggestions
            .next_playable(&session.history, min_gap, last_played.as_ref())
        {
            info!("Next from suggestion queue: {id}");
            return Decision::some(id, DecisionSource::Queue, started_from);
        }

        let base_id = session
            .suggestions
            .last()
            .cloned()
            .or_else(|| last_played.clone())
            .or_else(|| session.history.last().cloned())
            .or_else(|| session.suggestions.base_track_id().cloned());

        if let Some(base) = &base_id {
            if let Some(id) = self.refill(session, base, last_played.as_ref()) {
                info!("Next from refreshed suggestions for {base}: {id}");
                return Decision::some(id, DecisionSource::Refill, started_from);
            }
        } else {
            debug!("No base track, going straight to fallbacks");
        }

        let excluded = session.exclusion_set();
        let base_track = base_id.as_ref().and_then(|id| self.fetch_quietly(id));
        let diversify_away_from = base_track
            .as_ref()
            .filter(|track| session.languages.should_diversify(&track.language))
            .map(|track| track.language.as_str());
        if let Some(language) = diversify_away_from {
            debug!("{language} streak reached its threshold, sweeping other languages first");
        }

        let ctx = FallbackContext {
            last_played: last_played.as_ref(),
            base: base_track.as_ref(),
            excluded: &excluded,
            diversify_away_from,
        };
        let strategy = FallbackSearchStrategy::new(
            &self.config,
            &self.index,
            self.collaborators.metadata,
            self.collaborators.search,
            self.current_year(),
        );
        if let Some((id, tier)) = strategy.run(&ctx, rng) {
            info!("Next from fallback tier {tier:?}: {id}");
            // The old thread is used up; the next refill starts from `id`.
            session.suggestions.clear_queue();
            return Decision::some(id, tier.source(), started_from);
        }

        warn!("Every tier came up empty; clearing history and suggestions");
        session.clear_all();
        Decision::none(session.base_track_id().cloned())
    }

    /// Replace the queue with fresh suggestions for `base` and take the
    /// first playable one.
    fn refill(&self, session: &mut Session, base: &TrackId, last_played: Option<&TrackId>) -> Option<TrackId> {
        let excluded = session.exclusion_set();
        let suggestions = match self.collaborators.suggestions.fetch_suggestions(base) {
            Ok(suggestions) => suggestions,
            Err(e) => {
                warn!("Suggestions for {base} unavailable: {e}");
                return None;
            }
        };

        if session.suggestions.populate(suggestions, &excluded) == 0 {
            debug!("All suggestions for {base} already played or queued");
            return None;
        }
        session.suggestions.next_playable(
            &session.history,
            self.config.min_history_before_repeat,
            last_played,
        )
    }

    fn fetch_quietly(&self, id: &TrackId) -> Option<Track> {
        match self.collaborators.metadata.fetch(id) {
            Ok(track) => Some(track),
            Err(FetchError::MissingMetadata(_)) => {
                debug!("No metadata for base track {id}");
                None
            }
            Err(e) => {
                warn!("Metadata for base track {id} unavailable: {e}");
                None
            }
        }
    }
}
