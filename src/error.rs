//! # Pipeline Errors
//!
//! Configuration errors that abort the offline pipeline before any partial
//! output is written. They travel inside `anyhow` chains, so callers that
//! care about the kind can `downcast_ref::<PipelineError>()`.
//!
//! Data-quality gaps (a row missing a feature, a label that cannot be
//! resolved) are *not* errors. They are counted and logged by the stage
//! that drops them.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A configured input file does not exist.
    #[error("source '{name}' not found at {}", .path.display())]
    MissingSource { name: String, path: PathBuf },

    /// A source file lacks a column every record needs.
    #[error("source '{source_name}' is missing required column '{column}'")]
    MissingColumn { source_name: String, column: String },

    /// No row carried the label a trainer needs.
    #[error("no training rows with a {label} label")]
    EmptyTrainingSet { label: &'static str },

    /// Records need a predicted genre but no genre bundle was supplied.
    #[error("{unlabeled} records have no raw genre and no genre model was provided")]
    MissingGenreModel { unlabeled: usize },

    /// The parts of a model bundle disagree with each other.
    #[error("model bundle is inconsistent: {0}")]
    BundleMismatch(String),

    /// A bundle trained for one label type was used for another.
    #[error("expected a {expected} model bundle, found {found}")]
    WrongBundleKind { expected: String, found: String },
}
