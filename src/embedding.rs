//! Nearest-neighbour lookup over the precomputed embedding table.
//!
//! Vectors are L2-normalized on load so cosine similarity is a plain dot
//! product. The table is scanned linearly per query; that is fine for the
//! catalog sizes the training job produces.

use crate::error::{FetchError, FetchResult};
use crate::provider::{EmbeddingPayload, EmbeddingSource};
use crate::track::TrackId;
use log::{info, warn};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// Similarity index over track embeddings.
///
/// A failed load leaves the index permanently not ready; it is never
/// retried within a session.
#[derive(Debug, Default)]
pub struct EmbeddingIndex {
    ids: Vec<TrackId>,
    vectors: Vec<Vec<f32>>,
    positions: HashMap<TrackId, usize>,
    dimension: usize,
    ready: bool,
}

impl EmbeddingIndex {
    /// Index that never answers. Used when no embedding source is configured.
    #[must_use]
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Fetch and validate the embedding table. Never fails hard.
    pub fn load(source: &dyn EmbeddingSource) -> Self {
        match source.load().and_then(Self::from_payload) {
            Ok(index) => {
                info!(
                    "Embedding index ready: {} tracks, {} dimensions",
                    index.ids.len(),
                    index.dimension
                );
                index
            }
            Err(e) => {
                warn!("Embedding index unavailable for this session: {e}");
                Self::unavailable()
            }
        }
    }

    /// Build a ready index from a payload.
    ///
    /// # Errors
    ///
    /// Rejects empty tables, mismatched id/vector counts, ragged or
    /// zero-length vectors and vectors with zero norm.
    pub fn from_payload(payload: EmbeddingPayload) -> FetchResult<Self> {
        let EmbeddingPayload { ids, vectors } = payload;
        if ids.is_empty() {
            return Err(FetchError::transient("embedding table is empty"));
        }
        if ids.len() != vectors.len() {
            return Err(FetchError::Transient(format!(
                "embedding table has {} ids but {} vectors",
                ids.len(),
                vectors.len()
            )));
        }

        let dimension = vectors[0].len();
        if dimension == 0 {
            return Err(FetchError::transient("embedding vectors have no dimensions"));
        }

        let mut normalized = Vec::with_capacity(vectors.len());
        for (id, mut vector) in ids.iter().zip(vectors) {
            if vector.len() != dimension {
                return Err(FetchError::Transient(format!(
                    "vector for {id} has {} dimensions, expected {dimension}",
                    vector.len()
                )));
            }
            let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
            if !norm.is_finite() || norm == 0.0 {
                return Err(FetchError::Transient(format!("vector for {id} cannot be normalized")));
            }
            vector.iter_mut().for_each(|x| *x /= norm);
            normalized.push(vector);
        }

        // First occurrence wins for duplicated ids.
        let mut positions = HashMap::with_capacity(ids.len());
        for (position, id) in ids.iter().enumerate() {
            positions.entry(id.clone()).or_insert(position);
        }

        Ok(Self {
            ids,
            vectors: normalized,
            positions,
            dimension,
            ready: true,
        })
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Up to `k` most similar tracks to `id`, best first.
    ///
    /// Never returns `id` itself or anything in `exclude`. Ties keep catalog
    /// order. Empty when the index isn't ready or `id` has no vector.
    #[must_use]
    pub fn nearest_neighbors(&self, id: &TrackId, k: usize, exclude: &HashSet<TrackId>) -> Vec<TrackId> {
        if !self.ready || k == 0 {
            return Vec::new();
        }
        let Some(&query_pos) = self.positions.get(id) else {
            return Vec::new();
        };
        let query = &self.vectors[query_pos];

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .par_iter()
            .enumerate()
            .filter(|(pos, _)| {
                let candidate = &self.ids[*pos];
                candidate != id && !exclude.contains(candidate)
            })
            .map(|(pos, vector)| (pos, dot(query, vector)))
            .collect();

        // Collected in index order; a stable sort keeps ties in catalog order.
        scored.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

        let mut seen = HashSet::new();
        scored
            .into_iter()
            .map(|(pos, _)| &self.ids[pos])
            .filter(|candidate| seen.insert(*candidate))
            .take(k)
            .cloned()
            .collect()
    }
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Embedding table stored as a JSON file: `{"ids": [...], "vectors": [[...]]}`
#[derive(Debug, Clone)]
pub struct FileEmbeddingSource {
    path: PathBuf,
}

impl FileEmbeddingSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl EmbeddingSource for FileEmbeddingSource {
    fn load(&self) -> FetchResult<EmbeddingPayload> {
        let raw = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}
