//! Mood-labeled track database and mood-conditioned recommendations.
//!
//! Offline pipeline:
//! - [`merge`] - Merge feature sources, deduplicate, drop incomplete rows
//! - [`mood`] - Quadrant mood rule over valence and energy
//! - [`genre`] - Keyword super-genre heuristic
//! - [`train`] - Fit mood and genre classifiers into [`ml::ModelBundle`]s
//! - [`builder`] - Build the canonical [`database::TrackDatabase`]
//!
//! Serving:
//! - [`context`] - Load the database and personalization seed once
//! - [`recommend`] - Quota-balanced sampling for one mood
//! - [`enrich`] - Order-preserving batched detail lookup
//!
//! ### Supporting Modules
//!
//! - [`features`] - The shared acoustic feature vector
//! - [`dataset`] - Processed dataset persistence
//! - [`personalization`] - Seed file parsing and per-request sets
//! - [`ml`] - Scaler, encoder, split, forest, margin classifier, metrics
//! - [`config`] - Configuration and data directory management
//! - [`error`] - Configuration error kinds
//! - [`cli`] - Command-line interface definitions
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use valora::config::PipelineConfig;
//! use valora::context::ServeContext;
//! use valora::{builder, dataset, merge, ml, train};
//!
//! let config = PipelineConfig::default();
//!
//! // Merge and label the sources
//! let (tracks, _report) = merge::merge_sources(&config.sources)?;
//! dataset::write_processed(&config.processed_path, &tracks)?;
//!
//! // Train the genre model used to fill missing genres
//! let outcomes = train::train_models(
//!     &tracks,
//!     ml::ModelKind::Genre,
//!     &[ml::Algorithm::Forest],
//!     &config.train,
//!     &config.models_dir,
//! )?;
//!
//! // Build and persist the canonical database
//! let (db, _report) = builder::build_database(&tracks, Some(&outcomes[0].bundle))?;
//! db.save(&config.database_path)?;
//!
//! // Serve
//! let context = ServeContext::load(&config)?;
//! let result = context.recommend("Happy/Energetic", None, &mut rand::thread_rng());
//! println!("{}", result.message);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Pipeline operations return `anyhow::Result`. Configuration problems
//! (missing source file or column, empty training set, missing or
//! mismatched model bundle) are [`error::PipelineError`] values inside the
//! chain. Data-quality gaps are counted and logged, never returned.

pub mod builder;
pub mod cli;
pub mod config;
pub mod context;
pub mod database;
pub mod dataset;
pub mod enrich;
pub mod error;
pub mod features;
pub mod genre;
pub mod merge;
pub mod ml;
pub mod mood;
pub mod personalization;
pub mod recommend;
pub mod train;
