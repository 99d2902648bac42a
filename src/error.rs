//! Error types for the continuation engine.
//!
//! Collaborator failures are never fatal to a decision: the orchestrator
//! turns every [`FetchError`] into an empty tier and moves on. These types
//! exist so the boundary stays typed instead of leaking half-parsed payloads.

use crate::track::TrackId;
use thiserror::Error;

/// Result alias for collaborator calls
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Failure of an external collaborator call
#[derive(Error, Debug)]
pub enum FetchError {
    /// Network, storage or parse failure. Worth trying the next tier.
    #[error("transient fetch failure: {0}")]
    Transient(String),

    /// The collaborator does not know this track
    #[error("no metadata for track {0}")]
    MissingMetadata(TrackId),
}

impl FetchError {
    pub fn transient(err: impl std::fmt::Display) -> Self {
        Self::Transient(err.to_string())
    }
}

impl From<rusqlite::Error> for FetchError {
    fn from(err: rusqlite::Error) -> Self {
        Self::transient(err)
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::transient(err)
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        Self::transient(err)
    }
}

/// Play history misuse
#[derive(Error, Debug, PartialEq, Eq)]
pub enum HistoryError {
    #[error("play history is empty")]
    EmptyHistory,
}
