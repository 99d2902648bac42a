//! Contracts for the external collaborators the engine consumes.
//!
//! The orchestrator only ever talks to these traits. The catalog API proxy,
//! the local SQLite mirror in [`crate::catalog`] and the in-memory catalog
//! below are interchangeable behind them.

use crate::error::{FetchError, FetchResult};
use crate::track::{Track, TrackId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Looks up full metadata for a single track
pub trait TrackMetadataProvider: Send + Sync {
    /// # Errors
    ///
    /// `MissingMetadata` if the id is unknown, `Transient` for anything else.
    fn fetch(&self, id: &TrackId) -> FetchResult<Track>;
}

/// Upstream "what goes well after this" list
pub trait SuggestionProvider: Send + Sync {
    /// Ranked suggestions, best first.
    fn fetch_suggestions(&self, id: &TrackId) -> FetchResult<Vec<TrackId>>;
}

/// Free-text catalog search
pub trait CatalogSearchProvider: Send + Sync {
    fn search(&self, query: &str, limit: usize) -> FetchResult<Vec<Track>>;
}

/// Output of the offline embedding training job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingPayload {
    pub ids: Vec<TrackId>,
    pub vectors: Vec<Vec<f32>>,
}

/// Where the precomputed embedding table comes from
pub trait EmbeddingSource {
    fn load(&self) -> FetchResult<EmbeddingPayload>;
}

/// The three catalog-facing collaborators bundled for the orchestrator
pub struct Collaborators<'a> {
    pub metadata: &'a dyn TrackMetadataProvider,
    pub suggestions: &'a dyn SuggestionProvider,
    pub search: &'a dyn CatalogSearchProvider,
}

impl<'a, C> From<&'a C> for Collaborators<'a>
where
    C: TrackMetadataProvider + SuggestionProvider + CatalogSearchProvider,
{
    fn from(catalog: &'a C) -> Self {
        Self {
            metadata: catalog,
            suggestions: catalog,
            search: catalog,
        }
    }
}

/// Catalog held entirely in memory.
///
/// Search is an exact filter rather than free text: a query matches a track
/// when every whitespace token equals the track's language or year. Tokens
/// that are neither (e.g. "songs", "top") are ignored, so the popularity
/// query returns everything in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    tracks: Vec<Track>,
    suggestions: HashMap<TrackId, Vec<TrackId>>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            suggestions: HashMap::new(),
        }
    }

    pub fn set_suggestions(&mut self, id: TrackId, suggested: Vec<TrackId>) {
        self.suggestions.insert(id, suggested);
    }

    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    fn matches(track: &Track, query: &str) -> bool {
        query.split_whitespace().all(|token| {
            if let Ok(year) = token.parse::<i32>() {
                return track.year == Some(year);
            }
            match token.to_lowercase().as_str() {
                "songs" | "song" | "top" | "hits" | "latest" | "popular" | "best" => true,
                language => track.is_language(language),
            }
        })
    }
}

impl TrackMetadataProvider for MemoryCatalog {
    fn fetch(&self, id: &TrackId) -> FetchResult<Track> {
        self.tracks
            .iter()
            .find(|track| &track.id == id)
            .cloned()
            .ok_or_else(|| FetchError::MissingMetadata(id.clone()))
    }
}

impl SuggestionProvider for MemoryCatalog {
    fn fetch_suggestions(&self, id: &TrackId) -> FetchResult<Vec<TrackId>> {
        Ok(self.suggestions.get(id).cloned().unwrap_or_default())
    }
}

impl CatalogSearchProvider for MemoryCatalog {
    fn search(&self, query: &str, limit: usize) -> FetchResult<Vec<Track>> {
        Ok(self
            .tracks
            .iter()
            .filter(|track| Self::matches(track, query))
            .take(limit)
            .cloned()
            .collect())
    }
}
