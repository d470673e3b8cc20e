//! # Model Bundles
//!
//! A scaler, a label encoder and a classifier are only meaningful together:
//! the classifier was fitted on rows scaled by *that* scaler and emits codes
//! of *that* encoder. A [`ModelBundle`] is therefore the only unit that is
//! saved or loaded. It is one JSON document written atomically, and it is
//! checked for internal consistency every time it is built or read.

use super::{Algorithm, Classifier, LabelEncoder, StandardScaler};
use crate::dataset::write_atomically;
use crate::error::PipelineError;
use crate::features::{FeatureSet, FeatureVector};
use anyhow::{Context, Result};
use clap::ValueEnum;
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Which label a bundle predicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Mood,
    Genre,
}

impl ModelKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mood => "mood",
            Self::Genre => "genre",
        }
    }

    /// Mood models must not see valence or energy: the label is computed
    /// from exactly those two features.
    #[must_use]
    pub const fn feature_set(self) -> FeatureSet {
        match self {
            Self::Mood => FeatureSet::MoodSafe,
            Self::Genre => FeatureSet::Full,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub kind: ModelKind,
    pub feature_set: FeatureSet,
    /// Column names the scaler was fitted on, in order.
    pub feature_names: Vec<String>,
    pub scaler: StandardScaler,
    pub encoder: LabelEncoder,
    pub classifier: Classifier,
}

impl ModelBundle {
    /// Assemble and validate a bundle.
    ///
    /// # Errors
    ///
    /// [`PipelineError::BundleMismatch`] if the parts disagree on shape.
    pub fn new(
        kind: ModelKind,
        scaler: StandardScaler,
        encoder: LabelEncoder,
        classifier: Classifier,
    ) -> Result<Self, PipelineError> {
        let feature_set = kind.feature_set();
        let bundle = Self {
            kind,
            feature_set,
            feature_names: feature_set.names().into_iter().map(str::to_string).collect(),
            scaler,
            encoder,
            classifier,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    /// Check that all three parts agree on shape.
    ///
    /// # Errors
    ///
    /// [`PipelineError::BundleMismatch`] naming the first disagreement.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let mismatch = |what: String| Err(PipelineError::BundleMismatch(what));

        if self.feature_set != self.kind.feature_set() {
            return mismatch(format!(
                "{} model uses {:?} features, expected {:?}",
                self.kind,
                self.feature_set,
                self.kind.feature_set()
            ));
        }
        let expected: Vec<&str> = self.feature_set.names();
        if self.feature_names.iter().map(String::as_str).ne(expected.iter().copied()) {
            return mismatch(format!("feature names {:?} do not match {:?}", self.feature_names, expected));
        }
        if self.scaler.width() != expected.len() || self.scaler.scales.len() != expected.len() {
            return mismatch(format!(
                "scaler covers {} features, expected {}",
                self.scaler.width(),
                expected.len()
            ));
        }
        if self.classifier.n_features() != expected.len() {
            return mismatch(format!(
                "classifier expects {} features, expected {}",
                self.classifier.n_features(),
                expected.len()
            ));
        }
        if self.classifier.n_classes() != self.encoder.len() {
            return mismatch(format!(
                "classifier has {} classes but encoder knows {} labels",
                self.classifier.n_classes(),
                self.encoder.len()
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.classifier.algorithm()
    }

    /// `genre_forest_bundle.json` and friends.
    #[must_use]
    pub fn file_name(kind: ModelKind, algorithm: Algorithm) -> String {
        format!("{kind}_{algorithm}_bundle.json")
    }

    #[must_use]
    pub fn path_in(dir: &Path, kind: ModelKind, algorithm: Algorithm) -> PathBuf {
        dir.join(Self::file_name(kind, algorithm))
    }

    /// Write the bundle as one JSON document, atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomically(path, |file| {
            serde_json::to_writer(file, self).context("Failed to serialize model bundle")?;
            Ok(())
        })?;
        info!("Saved {} {} bundle to {}", self.kind, self.algorithm(), path.display());
        Ok(())
    }

    /// Read and validate a bundle.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or corrupt, or if it fails
    /// [`ModelBundle::validate`].
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open model bundle {}. Run `valora train` first.", path.display()))?;
        let bundle: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Model bundle {} is corrupt", path.display()))?;
        bundle
            .validate()
            .with_context(|| format!("Model bundle {} failed validation", path.display()))?;
        info!(
            "Loaded {} {} bundle ({} labels) from {}",
            bundle.kind,
            bundle.algorithm(),
            bundle.encoder.len(),
            path.display()
        );
        Ok(bundle)
    }

    /// Scale, classify and decode one track.
    #[must_use]
    pub fn predict_label(&self, features: &FeatureVector) -> Option<&str> {
        let row = self.scaler.transform_row(&self.feature_set.project(features));
        self.encoder.decode(self.classifier.predict(&row))
    }

    /// [`Self::predict_label`] over many tracks, in parallel.
    #[must_use]
    pub fn predict_labels(&self, features: &[FeatureVector]) -> Vec<Option<&str>> {
        features.par_iter().map(|f| self.predict_label(f)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::sample_features;
    use crate::ml::{ForestParams, RandomForest};
    use tempfile::TempDir;

    fn tiny_genre_bundle() -> ModelBundle {
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| {
                let energy = if i % 2 == 0 { 0.1 } else { 0.9 };
                FeatureSet::Full.project(&sample_features(0.5, energy))
            })
            .collect();
        let labels: Vec<&str> = (0..40).map(|i| if i % 2 == 0 { "Classical/Acoustic" } else { "Metal" }).collect();

        let scaler = StandardScaler::fit(&rows);
        let encoder = LabelEncoder::fit(&labels);
        let y: Vec<usize> = labels.iter().filter_map(|l| encoder.encode(l)).collect();
        let params = ForestParams { n_trees: 5, max_depth: 4, min_samples_leaf: 1, balanced: true, seed: 1 };
        let forest = RandomForest::fit(&scaler.transform(&rows), &y, encoder.len(), &params);

        ModelBundle::new(ModelKind::Genre, scaler, encoder, Classifier::Forest(forest)).unwrap()
    }

    #[test]
    fn test_bundle_predicts_decoded_labels() {
        let bundle = tiny_genre_bundle();
        assert_eq!(bundle.predict_label(&sample_features(0.5, 0.95)), Some("Metal"));
        assert_eq!(bundle.predict_label(&sample_features(0.5, 0.05)), Some("Classical/Acoustic"));

        let many = bundle.predict_labels(&[sample_features(0.5, 0.95), sample_features(0.5, 0.05)]);
        assert_eq!(many, vec![Some("Metal"), Some("Classical/Acoustic")]);
    }

    #[test]
    fn test_save_and_load_keep_parts_together() {
        let dir = TempDir::new().unwrap();
        let bundle = tiny_genre_bundle();
        let path = ModelBundle::path_in(dir.path(), ModelKind::Genre, Algorithm::Forest);
        assert!(path.ends_with("genre_forest_bundle.json"));

        bundle.save(&path).unwrap();
        let loaded = ModelBundle::load(&path).unwrap();
        assert_eq!(loaded, bundle);
    }

    #[test]
    fn test_mismatched_parts_are_rejected() {
        let bundle = tiny_genre_bundle();

        let mut wrong_encoder = bundle.clone();
        wrong_encoder.encoder = LabelEncoder::fit(&["Metal", "Other", "Hip-Hop"]);
        assert!(matches!(wrong_encoder.validate(), Err(PipelineError::BundleMismatch(_))));

        let mut wrong_scaler = bundle.clone();
        wrong_scaler.scaler.means.pop();
        wrong_scaler.scaler.scales.pop();
        assert!(matches!(wrong_scaler.validate(), Err(PipelineError::BundleMismatch(_))));

        let mut wrong_kind = bundle;
        wrong_kind.kind = ModelKind::Mood;
        assert!(matches!(wrong_kind.validate(), Err(PipelineError::BundleMismatch(_))));
    }

    #[test]
    fn test_load_rejects_tampered_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bundle.json");
        let mut bundle = tiny_genre_bundle();
        bundle.encoder.classes.push("Other".to_string());
        std::fs::write(&path, serde_json::to_string(&bundle).unwrap()).unwrap();

        let err = ModelBundle::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("inconsistent"));
    }
}
