//! # Canonical Database Builder
//!
//! Turns the processed dataset into the serving-time [`TrackDatabase`].
//!
//! Every record gets its mood recomputed from valence and energy, whatever
//! label it arrived with. Its genre comes from one of two tiers, and the
//! tier is kept on the record as a [`GenreSource`]:
//!
//! - **Raw string**: the keyword heuristic, whenever the record has genre text
//! - **Classifier**: the trained genre bundle, for records without any
//!
//! Records that still lack either label are dropped and counted.

use crate::database::{CanonicalTrack, TrackDatabase};
use crate::dataset::LabeledTrack;
use crate::error::PipelineError;
use crate::genre::{super_genre_from_raw, SuperGenre};
use crate::ml::{ModelBundle, ModelKind};
use crate::mood::{quadrant_mood, Mood};
use anyhow::Result;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fmt;

/// Where a record's super-genre came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenreSource {
    FromRawString(SuperGenre),
    FromClassifier(SuperGenre),
}

impl GenreSource {
    #[must_use]
    pub fn genre(self) -> SuperGenre {
        match self {
            Self::FromRawString(genre) | Self::FromClassifier(genre) => genre,
        }
    }
}

/// A built record before its provenance is dropped for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltRecord {
    pub track_id: String,
    pub track_name: String,
    pub artists: String,
    pub mood: Mood,
    pub genre: GenreSource,
}

impl BuiltRecord {
    #[must_use]
    pub fn into_track(self) -> CanonicalTrack {
        CanonicalTrack {
            track_id: self.track_id,
            track_name: self.track_name,
            artists: self.artists,
            mood: self.mood,
            super_genre: self.genre.genre(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub input: usize,
    pub from_raw_string: usize,
    pub from_classifier: usize,
    /// Records whose stored mood disagreed with the recomputed one.
    pub mood_overridden: usize,
    pub dropped_no_mood: usize,
    pub dropped_no_genre: usize,
    pub emitted: usize,
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in, {} out ({} genres from raw strings, {} from the classifier; dropped {} without mood, {} without genre; {} moods overridden)",
            self.input,
            self.emitted,
            self.from_raw_string,
            self.from_classifier,
            self.dropped_no_mood,
            self.dropped_no_genre,
            self.mood_overridden
        )
    }
}

/// Resolve both labels for every record.
///
/// `genre_model` is only needed when some record has no genre text. It must
/// be a genre bundle.
///
/// # Errors
///
/// [`PipelineError::MissingGenreModel`] when some record needs a prediction
/// and no bundle is given, [`PipelineError::WrongBundleKind`] when the
/// bundle is not a genre bundle.
pub fn build_records(
    tracks: &[LabeledTrack],
    genre_model: Option<&ModelBundle>,
) -> Result<(Vec<BuiltRecord>, BuildReport)> {
    let mut report = BuildReport { input: tracks.len(), ..BuildReport::default() };

    let heuristic: Vec<Option<SuperGenre>> =
        tracks.iter().map(|t| super_genre_from_raw(t.track_genre.as_deref())).collect();
    let unlabeled: Vec<usize> = (0..tracks.len()).filter(|&i| heuristic[i].is_none()).collect();

    let mut predicted: BTreeMap<usize, Option<SuperGenre>> = BTreeMap::new();
    if !unlabeled.is_empty() {
        let model = genre_model.ok_or(PipelineError::MissingGenreModel { unlabeled: unlabeled.len() })?;
        if model.kind != ModelKind::Genre {
            return Err(PipelineError::WrongBundleKind {
                expected: ModelKind::Genre.to_string(),
                found: model.kind.to_string(),
            }
            .into());
        }

        info!("Predicting genres for {} records with the {} model", unlabeled.len(), model.algorithm());
        let features: Vec<_> = unlabeled.iter().map(|&i| tracks[i].features).collect();
        for (&i, label) in unlabeled.iter().zip(model.predict_labels(&features)) {
            let genre = label.and_then(|l| l.parse::<SuperGenre>().ok());
            if genre.is_none() {
                debug!("Genre model returned no usable label for {}", tracks[i].track_id);
            }
            predicted.insert(i, genre);
        }
    }

    let mut records = Vec::with_capacity(tracks.len());
    for (i, track) in tracks.iter().enumerate() {
        let Some(mood) = quadrant_mood(track.features.valence, track.features.energy) else {
            report.dropped_no_mood += 1;
            continue;
        };
        if mood != track.mood {
            report.mood_overridden += 1;
        }

        let genre = match heuristic[i] {
            Some(genre) => GenreSource::FromRawString(genre),
            None => match predicted.get(&i).copied().flatten() {
                Some(genre) => GenreSource::FromClassifier(genre),
                None => {
                    report.dropped_no_genre += 1;
                    continue;
                }
            },
        };
        match genre {
            GenreSource::FromRawString(_) => report.from_raw_string += 1,
            GenreSource::FromClassifier(_) => report.from_classifier += 1,
        }

        records.push(BuiltRecord {
            track_id: track.track_id.clone(),
            track_name: track.track_name.clone(),
            artists: track.artists.clone(),
            mood,
            genre,
        });
    }
    report.emitted = records.len();

    let dropped = report.dropped_no_mood + report.dropped_no_genre;
    if dropped > 0 {
        warn!("Dropped {dropped} records with an unresolved label");
    }
    if report.mood_overridden > 0 {
        info!("Recomputed mood disagreed with the stored label for {} records", report.mood_overridden);
    }
    Ok((records, report))
}

/// Build the canonical database.
///
/// # Errors
///
/// Same as [`build_records`].
pub fn build_database(
    tracks: &[LabeledTrack],
    genre_model: Option<&ModelBundle>,
) -> Result<(TrackDatabase, BuildReport)> {
    let (records, report) = build_records(tracks, genre_model)?;
    let db = TrackDatabase::from_tracks(records.into_iter().map(BuiltRecord::into_track).collect());

    info!("Built track database: {report}");
    for (mood, count) in db.mood_distribution() {
        info!("  {mood}: {count}");
    }
    for (genre, count) in db.genre_distribution() {
        debug!("  {genre}: {count}");
    }
    Ok((db, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::sample_track;
    use crate::ml::{Classifier, ForestParams, LabelEncoder, RandomForest, StandardScaler};

    fn bundle(kind: ModelKind, label: &str) -> ModelBundle {
        let feature_set = kind.feature_set();
        let rows: Vec<Vec<f64>> = (0..4)
            .map(|i| feature_set.project(&crate::features::sample_features(0.1 * f64::from(i), 0.5)))
            .collect();
        let scaler = StandardScaler::fit(&rows);
        let encoder = LabelEncoder::fit(&[label]);
        let params = ForestParams { n_trees: 2, max_depth: 2, min_samples_leaf: 1, balanced: false, seed: 0 };
        let forest = RandomForest::fit(&scaler.transform(&rows), &[0, 0, 0, 0], 1, &params);
        ModelBundle::new(kind, scaler, encoder, Classifier::Forest(forest)).unwrap()
    }

    #[test]
    fn test_raw_strings_need_no_model() {
        let tracks = vec![sample_track("a", 0.9, 0.9, Some("indie")), sample_track("b", 0.1, 0.1, Some("polka"))];
        let (records, report) = build_records(&tracks, None).unwrap();

        assert_eq!(records[0].genre, GenreSource::FromRawString(SuperGenre::RockAlternative));
        assert_eq!(records[1].genre, GenreSource::FromRawString(SuperGenre::Other));
        assert_eq!(report.from_raw_string, 2);
        assert_eq!(report.emitted, 2);
    }

    #[test]
    fn test_unlabeled_records_use_classifier() {
        let tracks = vec![sample_track("a", 0.9, 0.9, Some("jazz")), sample_track("b", 0.2, 0.8, None)];
        let model = bundle(ModelKind::Genre, "Hip-Hop");
        let (db, report) = build_database(&tracks, Some(&model)).unwrap();

        assert_eq!(report.from_classifier, 1);
        assert_eq!(db.get("b").unwrap().super_genre, SuperGenre::HipHop);
        assert_eq!(db.get("b").unwrap().mood, Mood::AngryTense);
        assert_eq!(db.get("a").unwrap().super_genre, SuperGenre::JazzBluesReggae);
    }

    #[test]
    fn test_missing_model_is_fatal_only_when_needed() {
        let tracks = vec![sample_track("a", 0.9, 0.9, None), sample_track("b", 0.9, 0.9, Some(" "))];
        let err = build_records(&tracks, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingGenreModel { unlabeled: 2 })
        ));
    }

    #[test]
    fn test_mood_bundle_is_rejected() {
        let tracks = vec![sample_track("a", 0.9, 0.9, None)];
        let model = bundle(ModelKind::Mood, "Happy/Energetic");
        let err = build_records(&tracks, Some(&model)).unwrap_err();
        assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::WrongBundleKind { .. })));
    }

    #[test]
    fn test_unknown_predicted_label_drops_record() {
        let tracks = vec![sample_track("a", 0.9, 0.9, None), sample_track("b", 0.9, 0.9, Some("rock"))];
        let model = bundle(ModelKind::Genre, "Shoegaze");
        let (records, report) = build_records(&tracks, Some(&model)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(report.dropped_no_genre, 1);
    }

    #[test]
    fn test_stale_mood_is_overridden() {
        let mut track = sample_track("a", 0.9, 0.1, Some("rock"));
        track.mood = Mood::SadMelancholy;
        let (records, report) = build_records(&[track], None).unwrap();
        assert_eq!(records[0].mood, Mood::CalmPeaceful);
        assert_eq!(report.mood_overridden, 1);
    }
}
