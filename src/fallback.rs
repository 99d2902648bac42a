//! Fallback cascade used when the suggestion queue can't produce a track.
//!
//! Tiers, in default order:
//!
//! 1. **Embedding** - nearest neighbours of the last played track, limited to
//!    the preferred languages.
//! 2. **Language/year** - same language as the base track, a few years off
//!    its release year; relaxed to language only when that finds nothing.
//! 3. **Diversity** - preferred languages crossed with recent years.
//! 4. **Popularity** - whatever the catalog considers popular.
//!
//! When the base language has been on a streak long enough, the diversity
//! sweep moves ahead of the language/year tier. A failed collaborator call
//! empties the tier it happened in; it never ends the cascade.

use crate::config::AutoplayConfig;
use crate::embedding::EmbeddingIndex;
use crate::error::FetchError;
use crate::provider::{CatalogSearchProvider, TrackMetadataProvider};
use crate::session::DecisionSource;
use crate::track::{Track, TrackId};
use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackTier {
    Embedding,
    LanguageYear,
    Diversity,
    Popularity,
}

impl FallbackTier {
    /// Tier order for one decision.
    #[must_use]
    pub const fn order(diversify: bool) -> [Self; 4] {
        if diversify {
            [Self::Embedding, Self::Diversity, Self::LanguageYear, Self::Popularity]
        } else {
            [Self::Embedding, Self::LanguageYear, Self::Diversity, Self::Popularity]
        }
    }

    #[must_use]
    pub const fn source(self) -> DecisionSource {
        match self {
            Self::Embedding => DecisionSource::Embedding,
            Self::LanguageYear => DecisionSource::LanguageYear,
            Self::Diversity => DecisionSource::Diversity,
            Self::Popularity => DecisionSource::Popularity,
        }
    }
}

/// What the cascade knows about the moment it is deciding for.
#[derive(Debug, Clone, Copy)]
pub struct FallbackContext<'a> {
    pub last_played: Option<&'a TrackId>,
    pub base: Option<&'a Track>,
    pub excluded: &'a HashSet<TrackId>,
    /// Set when the base language is on a streak; swept last.
    pub diversify_away_from: Option<&'a str>,
}

pub struct FallbackSearchStrategy<'a> {
    config: &'a AutoplayConfig,
    index: &'a EmbeddingIndex,
    metadata: &'a dyn TrackMetadataProvider,
    search: &'a dyn CatalogSearchProvider,
    current_year: i32,
}

impl<'a> FallbackSearchStrategy<'a> {
    pub fn new(
        config: &'a AutoplayConfig,
        index: &'a EmbeddingIndex,
        metadata: &'a dyn TrackMetadataProvider,
        search: &'a dyn CatalogSearchProvider,
        current_year: i32,
    ) -> Self {
        Self {
            config,
            index,
            metadata,
            search,
            current_year,
        }
    }

    /// Walk the tiers; the first one with a candidate wins.
    pub fn run<R: Rng + ?Sized>(
        &self,
        ctx: &FallbackContext<'_>,
        rng: &mut R,
    ) -> Option<(TrackId, FallbackTier)> {
        let order = FallbackTier::order(ctx.diversify_away_from.is_some());
        order.into_iter().find_map(|tier| {
            debug!("Trying fallback tier {tier:?}");
            self.try_tier(tier, ctx, &mut *rng).map(|id| (id, tier))
        })
    }

    pub fn try_tier<R: Rng + ?Sized>(
        &self,
        tier: FallbackTier,
        ctx: &FallbackContext<'_>,
        rng: &mut R,
    ) -> Option<TrackId> {
        match tier {
            FallbackTier::Embedding => self.embedding_neighbor(ctx),
            FallbackTier::LanguageYear => ctx
                .base
                .and_then(|base| self.language_year(base, ctx.excluded, rng)),
            FallbackTier::Diversity => self.diversity_sweep(ctx, rng),
            FallbackTier::Popularity => self.popular(ctx.excluded, rng),
        }
    }

    /// Most similar neighbour in a preferred language.
    ///
    /// Starts with `neighbor_count` neighbours and doubles the window while
    /// none of them qualifies, until the index has nothing more to offer.
    fn embedding_neighbor(&self, ctx: &FallbackContext<'_>) -> Option<TrackId> {
        if !self.index.is_ready() {
            return None;
        }
        let last = ctx.last_played?;

        let mut k = self.config.neighbor_count.max(1);
        let mut checked = 0;
        loop {
            let neighbors = self.index.nearest_neighbors(last, k, ctx.excluded);
            for candidate in neighbors.iter().skip(checked) {
                match self.metadata.fetch(candidate) {
                    Ok(track) if self.is_preferred(&track.language) => return Some(candidate.clone()),
                    Ok(track) => debug!("Neighbour {candidate} is {}, not preferred", track.language),
                    Err(FetchError::MissingMetadata(id)) => debug!("Neighbour {id} has no metadata"),
                    Err(e) => {
                        warn!("Embedding tier gave up on metadata lookup: {e}");
                        return None;
                    }
                }
            }
            if neighbors.len() < k {
                return None;
            }
            checked = neighbors.len();
            k = k.saturating_mul(2);
        }
    }

    fn language_year<R: Rng + ?Sized>(
        &self,
        base: &Track,
        excluded: &HashSet<TrackId>,
        rng: &mut R,
    ) -> Option<TrackId> {
        let language = base.language.as_str();
        if language.is_empty() {
            return None;
        }

        if let Some(year) = base.year {
            let offsets = if year == self.current_year {
                &self.config.current_year_offsets
            } else {
                &self.config.year_offsets
            };
            if let Some(offset) = offsets.choose(rng) {
                let target = year + offset;
                let hits: Vec<Track> = self
                    .search_quietly(&format!("{language} songs {target}"))
                    .into_iter()
                    .filter(|track| {
                        track.is_language(language)
                            && track.released_near(target, self.config.year_tolerance)
                            && !excluded.contains(&track.id)
                    })
                    .collect();
                if let Some(track) = hits.choose(rng) {
                    return Some(track.id.clone());
                }
                debug!("Nothing in {language} around {target}, relaxing to language only");
            }
        }

        let hits: Vec<Track> = self
            .search_quietly(&format!("{language} songs"))
            .into_iter()
            .filter(|track| track.is_language(language) && !excluded.contains(&track.id))
            .collect();
        hits.choose(rng).map(|track| track.id.clone())
    }

    fn diversity_sweep<R: Rng + ?Sized>(&self, ctx: &FallbackContext<'_>, rng: &mut R) -> Option<TrackId> {
        let streaking = ctx.diversify_away_from.map(str::to_lowercase);
        let mut languages: Vec<&String> = self.config.preferred_languages.iter().collect();
        // Stable, so the configured order holds otherwise.
        languages.sort_by_key(|language| Some(language.to_lowercase()) == streaking);

        let newest = self.current_year;
        let oldest = newest - self.config.diversity_window_years + 1;

        for language in languages {
            for year in (oldest..=newest).rev() {
                let hits: Vec<Track> = self
                    .search_quietly(&format!("{language} songs {year}"))
                    .into_iter()
                    .filter(|track| track.is_language(language) && !ctx.excluded.contains(&track.id))
                    .collect();
                if let Some(track) = hits.choose(rng) {
                    debug!("Diversity sweep landed on {language} {year}");
                    return Some(track.id.clone());
                }
            }
        }
        None
    }

    fn popular<R: Rng + ?Sized>(&self, excluded: &HashSet<TrackId>, rng: &mut R) -> Option<TrackId> {
        let hits: Vec<Track> = self
            .search_quietly(&self.config.popularity_query)
            .into_iter()
            .filter(|track| !excluded.contains(&track.id))
            .collect();
        hits.choose(rng).map(|track| track.id.clone())
    }

    /// Search, treating any failure as no results.
    fn search_quietly(&self, query: &str) -> Vec<Track> {
        match self.search.search(query, self.config.search_limit) {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!("Catalog search \"{query}\" failed: {e}");
                Vec::new()
            }
        }
    }

    fn is_preferred(&self, language: &str) -> bool {
        self.config
            .preferred_languages
            .iter()
            .any(|preferred| preferred.eq_ignore_ascii_case(language))
    }
}
