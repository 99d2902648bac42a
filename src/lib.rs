//! Autoplay continuation engine.
//!
//! Whenever a track ends, something has to decide what plays next. Segue
//! makes that decision without looping over the same handful of tracks and
//! without stalling when upstream data is thin.
//!
//! Core modules:
//! - [`orchestrator`] - The `decide_next` protocol
//! - [`history`] - Bounded play history and the repeat gate
//! - [`queue`] - Upstream suggestions for the current thread
//! - [`fallback`] - Tiered search when suggestions run dry
//! - [`embedding`] - Nearest-neighbour lookup over track embeddings
//! - [`language`] - Consecutive-play counters per language
//! - [`session`] - Per-listener state
//!
//! ### Supporting Modules
//!
//! - [`provider`] - Collaborator contracts and an in-memory catalog
//! - [`catalog`] - SQLite catalog mirror
//! - [`config`] - Engine tuning and data directory management
//! - [`cli`], [`completion`] - Command-line definitions
//!
//! ## Quick Start Example
//!
//! ```
//! use segue::config::AutoplayConfig;
//! use segue::embedding::EmbeddingIndex;
//! use segue::orchestrator::RecommendationOrchestrator;
//! use segue::provider::{Collaborators, MemoryCatalog};
//! use segue::session::PlaybackEvent;
//! use segue::track::{Track, TrackId};
//! use rand::SeedableRng;
//!
//! let track = |id: &str, year| Track {
//!     id: TrackId::new(id),
//!     name: id.to_string(),
//!     language: "hindi".to_string(),
//!     year: Some(year),
//!     artists: Vec::new(),
//!     album: String::new(),
//!     audio_variants: Vec::new(),
//! };
//! let mut catalog = MemoryCatalog::new(vec![track("a", 2019), track("b", 2020)]);
//! catalog.set_suggestions(TrackId::new("a"), vec![TrackId::new("b")]);
//!
//! let orchestrator = RecommendationOrchestrator::new(
//!     AutoplayConfig::default(),
//!     EmbeddingIndex::unavailable(),
//!     Collaborators::from(&catalog),
//! );
//! let mut session = orchestrator.new_session();
//! let mut rng = rand::rngs::StdRng::seed_from_u64(1);
//!
//! orchestrator.record_played(&mut session, TrackId::new("a"));
//! let decision = orchestrator.decide_next(&mut session, PlaybackEvent::Ended, &mut rng);
//! assert_eq!(decision.track, Some(TrackId::new("b")));
//! ```
//!
//! ## Error Handling
//!
//! Collaborator failures never reach the caller of `decide_next`. A failing
//! tier is treated as empty and the next one is tried; when every tier is
//! empty the session is reset and the decision carries no track.

pub mod catalog;
pub mod cli;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod error;
pub mod fallback;
pub mod history;
pub mod language;
pub mod orchestrator;
pub mod provider;
pub mod queue;
pub mod session;
pub mod track;
