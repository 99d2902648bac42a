//! # Configuration Module
//!
//! Data directory layout and the tuning knobs of the continuation engine.
//!
//! ## Data Storage
//!
//! Segue keeps its catalog mirror and optional `config.json` in the
//! platform-standard data directory:
//! - Linux: `~/.local/share/segue/`
//! - macOS: `~/Library/Application Support/segue/`
//! - Windows: `%APPDATA%\segue\`

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Returns the platform-appropriate data directory for Segue, creating it
/// if needed.
///
/// # Errors
///
/// Fails if the system data directory cannot be determined or the `segue`
/// subdirectory cannot be created.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    let segue_dir = data_dir.join("segue");
    fs::create_dir_all(&segue_dir).with_context(|| {
        format!(
            "Failed to create Segue data directory at {}. Please check file permissions.",
            segue_dir.display()
        )
    })?;

    Ok(segue_dir)
}

/// Path of the local catalog mirror.
///
/// # Errors
///
/// See [`get_data_dir`].
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("catalog.db"))
}

/// Path of the optional engine configuration file.
///
/// # Errors
///
/// See [`get_data_dir`].
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("config.json"))
}

/// Tuning for the continuation engine.
///
/// Every field has a default, so a partial `config.json` is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoplayConfig {
    /// Capacity of the play history
    pub max_history_size: usize,
    /// A track may not replay until this many other plays have happened
    pub min_history_before_repeat: usize,
    /// Allow-list for the embedding tier, sweep order for the diversity tier
    pub preferred_languages: Vec<String>,
    /// Consecutive plays in one language before the diversity sweep is preferred
    pub default_language_threshold: u32,
    pub language_thresholds: HashMap<String, u32>,
    /// Year offsets tried around the base track's release year
    pub year_offsets: Vec<i32>,
    /// Offsets used when the base track came out this calendar year
    pub current_year_offsets: Vec<i32>,
    /// How far a result's year may stray from the targeted year
    pub year_tolerance: i32,
    /// How many recent years the diversity sweep covers
    pub diversity_window_years: i32,
    /// Neighbours requested from the embedding index per decision
    pub neighbor_count: usize,
    pub search_limit: usize,
    pub popularity_query: String,
}

impl Default for AutoplayConfig {
    fn default() -> Self {
        Self {
            max_history_size: 50,
            min_history_before_repeat: 10,
            preferred_languages: vec![
                "telugu".to_string(),
                "hindi".to_string(),
                "tamil".to_string(),
                "english".to_string(),
            ],
            default_language_threshold: 3,
            language_thresholds: HashMap::new(),
            year_offsets: vec![-3, -2, -1, 1, 2, 3],
            current_year_offsets: vec![-1, -2],
            year_tolerance: 1,
            diversity_window_years: 20,
            neighbor_count: 20,
            search_limit: 20,
            popularity_query: "top hits".to_string(),
        }
    }
}

impl AutoplayConfig {
    /// Read a configuration file, falling back to defaults when it is absent.
    ///
    /// # Errors
    ///
    /// Fails when the file exists but cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.validate()?;

        let languages = config
            .preferred_languages
            .iter()
            .map(|language| language.to_lowercase())
            .collect();
        Ok(Self {
            preferred_languages: languages,
            ..config
        })
    }

    /// Reject settings that would break the history invariants or leave the
    /// cascade nothing to try.
    ///
    /// # Errors
    ///
    /// Describes the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.max_history_size == 0 {
            bail!("max_history_size must be at least 1");
        }
        if self.min_history_before_repeat == 0 {
            bail!("min_history_before_repeat must be at least 1");
        }
        if self.min_history_before_repeat > self.max_history_size {
            bail!(
                "min_history_before_repeat ({}) cannot exceed max_history_size ({})",
                self.min_history_before_repeat,
                self.max_history_size
            );
        }
        if self.preferred_languages.is_empty() {
            bail!("preferred_languages cannot be empty");
        }
        if self.year_offsets.is_empty() || self.current_year_offsets.is_empty() {
            bail!("year offset sets cannot be empty");
        }
        if self.year_tolerance < 0 || self.diversity_window_years < 1 {
            bail!("year_tolerance must be >= 0 and diversity_window_years >= 1");
        }
        if self.search_limit == 0 {
            bail!("search_limit must be at least 1");
        }
        Ok(())
    }
}

/// Configuration for runtime behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Path to the catalog mirror
    pub db_path: PathBuf,
    /// Path to the engine configuration file
    pub config_path: PathBuf,
}

impl RuntimeConfig {
    /// Use the given paths, filling gaps from the platform data directory.
    ///
    /// The data directory is only touched when a path is missing.
    ///
    /// # Errors
    ///
    /// See [`get_data_dir`].
    pub fn resolve(db_path: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path {
            Some(path) => path,
            None => get_db_path()?,
        };
        let config_path = match config_path {
            Some(path) => path,
            None => get_config_path()?,
        };
        Ok(Self {
            db_path,
            config_path,
        })
    }

    /// Load the engine configuration this runtime points at.
    ///
    /// # Errors
    ///
    /// See [`AutoplayConfig::load`].
    pub fn autoplay_config(&self) -> Result<AutoplayConfig> {
        AutoplayConfig::load(&self.config_path)
    }
}
