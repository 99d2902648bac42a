//! # Integration Tests for Segue
//!
//! Full sessions against a SQLite catalog mirror, plus the binary's
//! command-line surface.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use segue::catalog::LocalCatalog;
use segue::config::AutoplayConfig;
use segue::embedding::{EmbeddingIndex, FileEmbeddingSource};
use segue::orchestrator::RecommendationOrchestrator;
use segue::provider::Collaborators;
use segue::session::{DecisionSource, PlaybackEvent};
use segue::track::TrackId;
use std::collections::HashSet;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

const DUMP: &str = r#"{
    "tracks": [
        {"id": "seed", "name": "Seed", "language": "telugu", "year": 2016, "popularity": 1},
        {"id": "s1", "name": "Suggested One", "language": "telugu", "year": 2017, "popularity": 2},
        {"id": "s2", "name": "Suggested Two", "language": "telugu", "year": 2015, "popularity": 3},
        {"id": "t14", "name": "Older", "language": "telugu", "year": 2014, "popularity": 4},
        {"id": "t18", "name": "Newer", "language": "telugu", "year": 2018, "popularity": 5},
        {"id": "h20", "name": "Hindi", "language": "hindi", "year": 2020, "popularity": 6},
        {"id": "e99", "name": "English", "language": "english", "year": 1999, "popularity": 7}
    ],
    "suggestions": {
        "seed": ["s1", "seed", "s2"],
        "s2": ["s1", "seed"]
    }
}"#;

/// Test helper to create a catalog file with sample data
fn create_test_catalog() -> Result<(TempDir, PathBuf)> {
    let temp_dir = TempDir::new()?;
    let dump_path = temp_dir.path().join("dump.json");
    std::fs::write(&dump_path, DUMP)?;

    let db_path = temp_dir.path().join("catalog.db");
    let catalog = LocalCatalog::open(&db_path)?;
    catalog.import_dump(&dump_path)?;

    Ok((temp_dir, db_path))
}

#[cfg(test)]
mod session_tests {
    use super::*;

    #[test]
    fn test_long_session_never_repeats_inside_gap() -> Result<()> {
        let (_dir, db_path) = create_test_catalog()?;
        let catalog = LocalCatalog::open(&db_path)?;
        let config = AutoplayConfig {
            max_history_size: 6,
            min_history_before_repeat: 3,
            ..AutoplayConfig::default()
        };
        let orchestrator =
            RecommendationOrchestrator::new(config, EmbeddingIndex::unavailable(), Collaborators::from(&catalog))
                .with_current_year(2024);
        let mut session = orchestrator.new_session();
        let mut rng = StdRng::seed_from_u64(11);

        orchestrator.record_played(&mut session, TrackId::new("seed"));
        let mut played = vec![TrackId::new("seed")];

        for _ in 0..40 {
            let decision = orchestrator.decide_next(&mut session, PlaybackEvent::Ended, &mut rng);
            let Some(next) = decision.track else {
                // Exhaustion resets the session; start over from the seed.
                assert!(session.history().is_empty());
                orchestrator.record_played(&mut session, TrackId::new("seed"));
                played = vec![TrackId::new("seed")];
                continue;
            };
            let recent: Vec<_> = played.iter().rev().take(3).collect();
            assert!(!recent.contains(&&next), "{next} replayed within the gap: {played:?}");
            assert!(session.history().len() <= 6);

            orchestrator.record_played(&mut session, next.clone());
            played.push(next);
        }
        Ok(())
    }

    #[test]
    fn test_suggestions_then_fallbacks() -> Result<()> {
        let (_dir, db_path) = create_test_catalog()?;
        let catalog = LocalCatalog::open(&db_path)?;
        let orchestrator = RecommendationOrchestrator::new(
            AutoplayConfig::default(),
            EmbeddingIndex::unavailable(),
            Collaborators::from(&catalog),
        )
        .with_current_year(2024);
        let mut session = orchestrator.new_session();
        let mut rng = StdRng::seed_from_u64(3);

        orchestrator.record_played(&mut session, TrackId::new("seed"));

        let first = orchestrator.decide_next(&mut session, PlaybackEvent::Ended, &mut rng);
        assert_eq!(first.track, Some(TrackId::new("s1")));
        assert_eq!(first.source, Some(DecisionSource::Refill));
        orchestrator.record_played(&mut session, TrackId::new("s1"));

        let second = orchestrator.decide_next(&mut session, PlaybackEvent::Ended, &mut rng);
        assert_eq!(second.track, Some(TrackId::new("s2")));
        assert_eq!(second.source, Some(DecisionSource::Queue));
        orchestrator.record_played(&mut session, TrackId::new("s2"));

        // s2's suggestions are all played, so the cascade takes over.
        let third = orchestrator.decide_next(&mut session, PlaybackEvent::Ended, &mut rng);
        let next = third.track.expect("catalog still has unplayed tracks");
        assert!(!["seed", "s1", "s2"].contains(&next.as_str()));
        assert!(matches!(
            third.source,
            Some(DecisionSource::LanguageYear | DecisionSource::Diversity | DecisionSource::Popularity)
        ));
        Ok(())
    }

    #[test]
    fn test_embeddings_drive_first_fallback() -> Result<()> {
        let (dir, db_path) = create_test_catalog()?;
        let vectors_path = dir.path().join("vectors.json");
        std::fs::write(
            &vectors_path,
            r#"{"ids": ["e99", "h20", "t18"], "vectors": [[1.0, 0.0], [0.8, 0.2], [0.0, 1.0]]}"#,
        )?;

        let catalog = LocalCatalog::open(&db_path)?;
        let index = EmbeddingIndex::load(&FileEmbeddingSource::new(&vectors_path));
        assert!(index.is_ready());

        let orchestrator =
            RecommendationOrchestrator::new(AutoplayConfig::default(), index, Collaborators::from(&catalog))
                .with_current_year(2024);
        let mut session = orchestrator.new_session();
        let mut rng = StdRng::seed_from_u64(5);

        // e99 has no suggestions, so the embedding tier answers.
        orchestrator.record_played(&mut session, TrackId::new("e99"));
        let decision = orchestrator.decide_next(&mut session, PlaybackEvent::Ended, &mut rng);
        assert_eq!(decision.track, Some(TrackId::new("h20")));
        assert_eq!(decision.source, Some(DecisionSource::Embedding));
        Ok(())
    }

    #[test]
    fn test_sessions_are_independent() -> Result<()> {
        let (_dir, db_path) = create_test_catalog()?;
        let catalog = LocalCatalog::open(&db_path)?;
        let orchestrator = RecommendationOrchestrator::new(
            AutoplayConfig::default(),
            EmbeddingIndex::unavailable(),
            Collaborators::from(&catalog),
        );
        let mut alice = orchestrator.new_session();
        let bob = orchestrator.new_session();

        orchestrator.record_played(&mut alice, TrackId::new("seed"));
        assert_eq!(alice.history().len(), 1);
        assert!(bob.history().is_empty());

        let excluded: HashSet<_> = alice.exclusion_set();
        assert!(excluded.contains(&TrackId::new("seed")));
        assert!(bob.exclusion_set().is_empty());
        Ok(())
    }
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    fn segue() -> Command {
        Command::new(env!("CARGO_BIN_EXE_segue"))
    }

    #[test]
    fn test_cli_help_displays_correctly() {
        let output = segue().arg("--help").output().expect("Failed to run help command");

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("segue"));
        assert!(stdout.contains("autoplay"));
        assert!(stdout.contains("init-db"));
        assert!(stdout.contains("completion"));
    }

    #[test]
    fn test_init_db_then_autoplay() -> Result<()> {
        let dir = TempDir::new()?;
        let dump_path = dir.path().join("dump.json");
        std::fs::write(&dump_path, DUMP)?;
        let db_path = dir.path().join("cli.db");
        let config_path = dir.path().join("missing-config.json");

        let output = segue()
            .args(["--db", db_path.to_str().unwrap(), "init-db", dump_path.to_str().unwrap()])
            .output()?;
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        assert!(String::from_utf8_lossy(&output.stdout).contains("Imported 7 tracks"));

        let output = segue()
            .args([
                "--db",
                db_path.to_str().unwrap(),
                "--config",
                config_path.to_str().unwrap(),
                "autoplay",
                "seed",
                "--count",
                "3",
                "--seed",
                "1",
            ])
            .output()?;
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Suggested One"));
        assert!(stdout.contains("[refill]"));
        Ok(())
    }

    #[test]
    fn test_autoplay_without_catalog_fails() -> Result<()> {
        let dir = TempDir::new()?;
        let output = segue()
            .args([
                "--db",
                dir.path().join("absent.db").to_str().unwrap(),
                "--config",
                dir.path().join("absent.json").to_str().unwrap(),
                "autoplay",
                "x",
            ])
            .output()?;
        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("init-db"));
        Ok(())
    }

    #[test]
    fn test_completion_generation() {
        let output = segue()
            .args(["completion", "bash"])
            .output()
            .expect("Failed to run completion command");

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("_segue"));
        assert!(stdout.contains("complete"));
    }
}
