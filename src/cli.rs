//! # Command-Line Interface Module
//!
//! This module defines the command-line interface for Valora using Clap
//! derive macros. Each subcommand runs one pipeline stage.
//!
//! ## Commands
//!
//! - `merge`: Merge feature sources into the processed dataset
//! - `train`: Fit mood or genre models and write bundles plus reports
//! - `build`: Build the canonical track database
//! - `recommend`: Print recommendations for a mood as JSON
//! - `stats`: Show mood and genre distributions of the database
//!
//! ## Examples
//!
//! ```bash
//! valora merge
//! valora train --model genre --algorithm both
//! valora build
//! valora recommend --mood "Happy/Energetic" --count 10
//! ```

use crate::ml::{Algorithm, ModelKind};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "valora")]
#[command(about = "Valora: mood-labeled track database and recommendations")]
#[command(version)]
pub struct Args {
    /// JSON config file; missing keys use defaults
    #[arg(long, global = true, env = "VALORA_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Which algorithm families `train` fits.
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum AlgorithmChoice {
    Forest,
    Svm,
    /// Both, sharing one scaler and encoder
    Both,
}

impl AlgorithmChoice {
    #[must_use]
    pub fn algorithms(self) -> Vec<Algorithm> {
        match self {
            Self::Forest => vec![Algorithm::Forest],
            Self::Svm => vec![Algorithm::Svm],
            Self::Both => vec![Algorithm::Forest, Algorithm::Svm],
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Merge the configured sources into the processed dataset
    ///
    /// Deduplicates by track id (first source wins), drops rows with a
    /// missing feature, and labels every row with its quadrant mood and
    /// heuristic super-genre.
    Merge,

    /// Train a classifier from the processed dataset
    ///
    /// Writes `<model>_<algorithm>_bundle.json` and an evaluation report
    /// into the models directory.
    Train {
        /// Label to learn
        #[arg(long, value_enum)]
        model: ModelKind,

        /// Algorithm family
        #[arg(long, value_enum, default_value = "forest")]
        algorithm: AlgorithmChoice,
    },

    /// Build the canonical track database
    ///
    /// Tracks without raw genre text get their genre from the configured
    /// genre bundle.
    Build,

    /// Recommend tracks for a mood
    Recommend {
        /// One of Happy/Energetic, Calm/Peaceful, Angry/Tense, Sad/Melancholy
        #[arg(long)]
        mood: String,

        /// Override the target list length
        #[arg(long)]
        count: Option<usize>,

        /// Override the personalization seed file
        #[arg(long, value_name = "FILE")]
        seed_file: Option<PathBuf>,

        /// Seed the sampler for reproducible output
        #[arg(long)]
        rng_seed: Option<u64>,
    },

    /// Show label distributions of the track database
    Stats,
}
