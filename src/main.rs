//! # Segue - Autoplay Continuation Engine
//!
//! Command-line front end: builds the local catalog mirror and drives
//! simulated autoplay sessions against it.
//!
//! ## Usage
//!
//! ```bash
//! # Import a catalog dump
//! segue init-db catalog.json
//!
//! # Let the engine pick 25 tracks after a seed track
//! segue autoplay 3IoDK8qI --count 25
//!
//! # Same, reproducibly and with content similarity enabled
//! segue autoplay 3IoDK8qI --seed 7 --embeddings vectors.json
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use segue::catalog::LocalCatalog;
use segue::cli;
use segue::completion;
use segue::config::{self, AutoplayConfig, RuntimeConfig};
use segue::embedding::{EmbeddingIndex, FileEmbeddingSource};
use segue::orchestrator::RecommendationOrchestrator;
use segue::provider::{Collaborators, TrackMetadataProvider};
use segue::session::PlaybackEvent;
use segue::track::TrackId;
use std::path::Path;

/// Main entry point for the Segue binary.
///
/// # Logging
///
/// Controlled via `RUST_LOG`:
/// - `RUST_LOG=debug segue autoplay <id>` - See every tier the engine tries
/// - `RUST_LOG=segue::fallback=debug segue autoplay <id>` - Module-specific logging
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    match args.command {
        cli::Command::InitDb { dump, force } => {
            let db_path = match args.db {
                Some(path) => path,
                None => config::get_db_path()?,
            };
            if force && db_path.exists() {
                info!("Removing existing catalog at {}", db_path.display());
                std::fs::remove_file(&db_path)
                    .with_context(|| format!("Failed to remove {}", db_path.display()))?;
            }

            let catalog = LocalCatalog::open(&db_path)?;
            let stats = catalog.import_dump(&dump)?;
            println!(
                "Imported {} tracks and {} suggestion lists into {}",
                stats.tracks,
                stats.suggestions,
                db_path.display()
            );
        }
        cli::Command::Autoplay {
            track,
            count,
            seed,
            embeddings,
        } => {
            let runtime = RuntimeConfig::resolve(args.db, args.config)?;
            let config = runtime.autoplay_config()?;
            run_autoplay(&runtime.db_path, config, TrackId::from(track), count, seed, embeddings.as_deref())?;
        }
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(&shell), &mut cmd);
        }
    }

    Ok(())
}

fn run_autoplay(
    db_path: &Path,
    config: AutoplayConfig,
    seed_track: TrackId,
    count: usize,
    seed: Option<u64>,
    embeddings: Option<&Path>,
) -> Result<()> {
    if !db_path.exists() {
        anyhow::bail!(
            "No catalog at {}. Run `segue init-db <dump.json>` first.",
            db_path.display()
        );
    }
    let catalog = LocalCatalog::open(db_path)?;
    debug!("Catalog holds {} tracks", catalog.track_count()?);

    let index = match embeddings {
        Some(path) => EmbeddingIndex::load(&FileEmbeddingSource::new(path)),
        None => EmbeddingIndex::unavailable(),
    };

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let orchestrator = RecommendationOrchestrator::new(config, index, Collaborators::from(&catalog));
    let mut session = orchestrator.new_session();

    println!("▶ {}", describe(&catalog, &seed_track));
    orchestrator.record_played(&mut session, seed_track);

    for step in 1..=count {
        let decision = orchestrator.decide_next(&mut session, PlaybackEvent::Ended, &mut rng);
        let (Some(next), Some(source)) = (decision.track, decision.source) else {
            println!("■ Nothing left to play after {} tracks", step - 1);
            return Ok(());
        };
        println!("{step:>3}. {} [{source}]", describe(&catalog, &next));
        orchestrator.record_played(&mut session, next);
    }

    Ok(())
}

fn describe(catalog: &LocalCatalog, id: &TrackId) -> String {
    match catalog.fetch(id) {
        Ok(track) => {
            let year = track.year.map(|y| y.to_string()).unwrap_or_else(|| "?".to_string());
            format!("{} - {} ({}, {year})", track.artists.join(", "), track.name, track.language)
        }
        Err(_) => id.to_string(),
    }
}
