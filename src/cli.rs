//! # Command-Line Interface Module
//!
//! Defines the `segue` command line with Clap derive macros.
//!
//! ## Commands
//!
//! - `init-db`: Build the local catalog mirror from a JSON dump
//! - `autoplay`: Simulate an autoplay session from a seed track
//! - `completion`: Generate shell completion scripts
//!
//! ## Examples
//!
//! ```bash
//! segue init-db catalog.json
//! segue autoplay 3IoDK8qI --count 25 --seed 7
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser)]
#[command(name = "segue")]
#[command(about = "Segue: decides what plays next without repeating itself")]
#[command(version)]
pub struct Args {
    /// Catalog database to use instead of the one in the data directory
    #[arg(long, global = true, env = "SEGUE_DB")]
    pub db: Option<PathBuf>,

    /// Engine configuration file (JSON)
    #[arg(long, global = true, env = "SEGUE_CONFIG")]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build the local catalog mirror from a JSON dump
    ///
    /// The dump holds `tracks` (id, name, language, year, artists, album,
    /// audio_variants, popularity) and `suggestions` (track id to ranked ids).
    InitDb {
        /// Path to the catalog dump
        dump: PathBuf,

        /// Delete an existing catalog first instead of merging into it
        #[arg(long)]
        force: bool,
    },

    /// Simulate autoplay starting from a track
    ///
    /// Records the seed as played, then keeps asking the engine what comes
    /// next, printing every decision and the tier that produced it. Stops
    /// early when the engine has nothing left.
    Autoplay {
        /// Track id to start from
        #[arg(value_hint = clap::ValueHint::Other)]
        track: String,

        /// How many follow-up tracks to decide
        #[arg(short, long, default_value = "20")]
        count: usize,

        /// Seed for repeatable runs
        #[arg(long)]
        seed: Option<u64>,

        /// Precomputed embedding table (JSON with `ids` and `vectors`)
        #[arg(long)]
        embeddings: Option<PathBuf>,
    },

    /// Generate shell completions
    ///
    /// Usage: segue completion bash > ~/.local/share/bash-completion/completions/segue
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}
