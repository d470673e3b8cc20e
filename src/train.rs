//! # Model Trainers
//!
//! Offline fitting of the mood and genre classifiers from the processed
//! dataset. Both trainers share one pipeline:
//!
//! 1. Project each labeled track onto the model's feature set
//! 2. Encode the label vocabulary alphabetically
//! 3. Split stratified by label, then fit the scaler on the training side
//! 4. Fit one or both algorithm families on the same scaled rows
//! 5. Evaluate on the held-out side, write a text report, save the bundle
//!
//! When both families are trained they share the scaler, the encoder and
//! the split, so their reports are directly comparable.

use crate::dataset::{write_atomically, LabeledTrack};
use crate::error::PipelineError;
use crate::ml::metrics::{evaluate, Evaluation};
use crate::ml::split::stratified_split;
use crate::ml::{
    Algorithm, Classifier, ForestParams, LabelEncoder, LinearSvm, ModelBundle, ModelKind, RandomForest,
    StandardScaler, SvmParams,
};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Hyper-parameters for every trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub test_fraction: f64,
    pub seed: u64,
    pub mood_forest: ForestParams,
    pub genre_forest: ForestParams,
    pub svm: SvmParams,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            mood_forest: ForestParams::mood(),
            genre_forest: ForestParams::genre(),
            svm: SvmParams::default(),
        }
    }
}

impl TrainConfig {
    #[must_use]
    pub fn forest_params(&self, kind: ModelKind) -> &ForestParams {
        match kind {
            ModelKind::Mood => &self.mood_forest,
            ModelKind::Genre => &self.genre_forest,
        }
    }
}

/// Label a trainer learns for one track, if the track has one.
fn target_label(kind: ModelKind, track: &LabeledTrack) -> Option<&'static str> {
    match kind {
        ModelKind::Mood => Some(track.mood.as_str()),
        ModelKind::Genre => track.super_genre.map(|g| g.as_str()),
    }
}

/// Scaled, encoded and split training data shared by both algorithm
/// families of one model kind.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub kind: ModelKind,
    pub scaler: StandardScaler,
    pub encoder: LabelEncoder,
    pub x_train: Vec<Vec<f64>>,
    pub y_train: Vec<usize>,
    pub x_test: Vec<Vec<f64>>,
    pub y_test: Vec<usize>,
}

/// Project, encode, split and scale the rows that carry a `kind` label.
/// The scaler sees the training split only.
///
/// # Errors
///
/// [`PipelineError::EmptyTrainingSet`] when no row carries a label.
pub fn prepare(tracks: &[LabeledTrack], kind: ModelKind, config: &TrainConfig) -> Result<PreparedData, PipelineError> {
    let feature_set = kind.feature_set();
    let (rows, labels): (Vec<Vec<f64>>, Vec<&str>) = tracks
        .iter()
        .filter_map(|track| target_label(kind, track).map(|label| (feature_set.project(&track.features), label)))
        .unzip();

    if rows.is_empty() {
        return Err(PipelineError::EmptyTrainingSet { label: kind.as_str() });
    }
    let skipped = tracks.len() - rows.len();
    if skipped > 0 {
        info!("{skipped} tracks have no {kind} label and are left out of training");
    }

    let encoder = LabelEncoder::fit(&labels);
    let y: Vec<usize> = labels.iter().filter_map(|label| encoder.encode(label)).collect();
    let split = stratified_split(&y, config.test_fraction, config.seed);

    let train_rows: Vec<Vec<f64>> = split.train.iter().map(|&i| rows[i].clone()).collect();
    let scaler = StandardScaler::fit(&train_rows);
    let x_train = scaler.transform(&train_rows);
    let x_test: Vec<Vec<f64>> = split.test.iter().map(|&i| scaler.transform_row(&rows[i])).collect();

    info!(
        "Prepared {kind} data: {} train / {} test rows, {} features, {} labels",
        x_train.len(),
        x_test.len(),
        feature_set.len(),
        encoder.len()
    );

    Ok(PreparedData {
        kind,
        y_train: split.train.iter().map(|&i| y[i]).collect(),
        y_test: split.test.iter().map(|&i| y[i]).collect(),
        scaler,
        encoder,
        x_train,
        x_test,
    })
}

/// Fit one algorithm family on prepared data.
#[must_use]
pub fn fit_classifier(data: &PreparedData, algorithm: Algorithm, config: &TrainConfig) -> Classifier {
    let start = Instant::now();
    let n_classes = data.encoder.len();
    let classifier = match algorithm {
        Algorithm::Forest => Classifier::Forest(RandomForest::fit(
            &data.x_train,
            &data.y_train,
            n_classes,
            config.forest_params(data.kind),
        )),
        Algorithm::Svm => Classifier::Svm(LinearSvm::fit(&data.x_train, &data.y_train, n_classes, &config.svm)),
    };
    debug!("Fitted {} {algorithm} in {:.2?}", data.kind, start.elapsed());
    classifier
}

/// Result of training one algorithm family.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub bundle: ModelBundle,
    pub evaluation: Evaluation,
    pub bundle_path: PathBuf,
    pub report_path: PathBuf,
}

/// `<model>_<algorithm>_report.txt`
#[must_use]
pub fn report_file_name(kind: ModelKind, algorithm: Algorithm) -> String {
    format!("{kind}_{algorithm}_report.txt")
}

/// Train, evaluate and persist `kind` for each algorithm in `algorithms`.
/// Bundles and reports land in `models_dir`.
///
/// # Errors
///
/// Returns an error if preparation fails, a bundle is inconsistent, or an
/// output file cannot be written.
pub fn train_models(
    tracks: &[LabeledTrack],
    kind: ModelKind,
    algorithms: &[Algorithm],
    config: &TrainConfig,
    models_dir: &Path,
) -> Result<Vec<TrainOutcome>> {
    let data = prepare(tracks, kind, config).with_context(|| format!("Failed to prepare {kind} training data"))?;
    if data.x_test.is_empty() {
        warn!("No held-out rows for the {kind} model; the evaluation report will be empty");
    }

    let mut outcomes = Vec::with_capacity(algorithms.len());
    for &algorithm in algorithms {
        info!("Training {kind} model with {algorithm}...");
        let classifier = fit_classifier(&data, algorithm, config);

        let predicted: Vec<usize> = data.x_test.iter().map(|row| classifier.predict(row)).collect();
        let evaluation = evaluate(&data.y_test, &predicted, &data.encoder.classes);
        info!("{kind} {algorithm} accuracy: {:.4}", evaluation.accuracy);

        let bundle = ModelBundle::new(kind, data.scaler.clone(), data.encoder.clone(), classifier)?;
        let bundle_path = ModelBundle::path_in(models_dir, kind, algorithm);
        bundle.save(&bundle_path)?;

        let report_path = models_dir.join(report_file_name(kind, algorithm));
        let report = evaluation.render(&format!("{kind} model ({algorithm})"));
        write_atomically(&report_path, |file| {
            file.write_all(report.as_bytes())
                .with_context(|| format!("Failed to write report {}", report_path.display()))
        })?;

        outcomes.push(TrainOutcome { bundle, evaluation, bundle_path, report_path });
    }
    Ok(outcomes)
}
