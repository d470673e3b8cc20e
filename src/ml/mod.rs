//! # Classifiers
//!
//! Everything the offline trainers need: preprocessing, a stratified
//! splitter, the two algorithm families, evaluation and the bundle that
//! keeps a fitted scaler, encoder and classifier together on disk.
//!
//! - [`forest`] - Random forest, the primary model
//! - [`svm`] - Linear one-vs-rest margin classifier, the comparison baseline
//! - [`preprocess`] - `StandardScaler` and `LabelEncoder`
//! - [`split`] - Stratified train/test split
//! - [`metrics`] - Accuracy, per-class precision/recall, confusion matrix
//! - [`bundle`] - The persisted scaler + encoder + classifier unit

pub mod bundle;
pub mod forest;
pub mod metrics;
pub mod preprocess;
pub mod split;
pub mod svm;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use bundle::{ModelBundle, ModelKind};
pub use forest::{ForestParams, RandomForest};
pub use preprocess::{LabelEncoder, StandardScaler};
pub use svm::{LinearSvm, SvmParams};

/// Algorithm family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    Forest,
    Svm,
}

impl Algorithm {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forest => "forest",
            Self::Svm => "svm",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A fitted classifier of either family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum Classifier {
    Forest(RandomForest),
    Svm(LinearSvm),
}

impl Classifier {
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        match self {
            Self::Forest(_) => Algorithm::Forest,
            Self::Svm(_) => Algorithm::Svm,
        }
    }

    /// Class code for one scaled row.
    #[must_use]
    pub fn predict(&self, row: &[f64]) -> usize {
        match self {
            Self::Forest(model) => model.predict(row),
            Self::Svm(model) => model.predict(row),
        }
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        match self {
            Self::Forest(model) => model.n_features(),
            Self::Svm(model) => model.n_features(),
        }
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        match self {
            Self::Forest(model) => model.n_classes(),
            Self::Svm(model) => model.n_classes(),
        }
    }
}
