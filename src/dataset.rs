//! # Processed Dataset
//!
//! The merged, mood-labeled table that sits between the source merger and
//! the trainers / database builder. Unlike the canonical database it keeps
//! the full feature vector and the raw genre text.

use crate::features::{FeatureVector, FEATURE_NAMES};
use crate::genre::SuperGenre;
use crate::mood::{quadrant_mood, Mood};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One merged track with every feature present.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTrack {
    pub track_id: String,
    pub track_name: String,
    pub artists: String,
    /// Raw genre text from the source, if it had any.
    pub track_genre: Option<String>,
    pub mood: Mood,
    /// Heuristic bucket; `None` when the track had no genre text.
    pub super_genre: Option<SuperGenre>,
    pub features: FeatureVector,
}

/// On-disk row layout. Label and feature cells may be blank.
#[derive(Debug, Serialize, Deserialize)]
struct ProcessedRow {
    track_id: String,
    track_name: String,
    artists: String,
    track_genre: Option<String>,
    mood: Option<String>,
    super_genre: Option<String>,
    danceability: Option<f64>,
    energy: Option<f64>,
    key: Option<f64>,
    loudness: Option<f64>,
    speechiness: Option<f64>,
    acousticness: Option<f64>,
    instrumentalness: Option<f64>,
    liveness: Option<f64>,
    valence: Option<f64>,
    tempo: Option<f64>,
    time_signature: Option<f64>,
}

impl From<&LabeledTrack> for ProcessedRow {
    fn from(track: &LabeledTrack) -> Self {
        let f = &track.features;
        Self {
            track_id: track.track_id.clone(),
            track_name: track.track_name.clone(),
            artists: track.artists.clone(),
            track_genre: track.track_genre.clone(),
            mood: Some(track.mood.to_string()),
            super_genre: track.super_genre.map(|g| g.to_string()),
            danceability: Some(f.danceability),
            energy: Some(f.energy),
            key: Some(f.key),
            loudness: Some(f.loudness),
            speechiness: Some(f.speechiness),
            acousticness: Some(f.acousticness),
            instrumentalness: Some(f.instrumentalness),
            liveness: Some(f.liveness),
            valence: Some(f.valence),
            tempo: Some(f.tempo),
            time_signature: Some(f.time_signature),
        }
    }
}

impl ProcessedRow {
    /// Parse the row, recomputing mood from valence and energy. The stored
    /// mood cell never decides acceptance. The flag is set when the stored
    /// cell disagreed with the recomputed label.
    fn into_track(self) -> Option<(LabeledTrack, bool)> {
        let features = FeatureVector::from_ordered(&[
            self.danceability,
            self.energy,
            self.key,
            self.loudness,
            self.speechiness,
            self.acousticness,
            self.instrumentalness,
            self.liveness,
            self.valence,
            self.tempo,
            self.time_signature,
        ])?;
        let mood = quadrant_mood(features.valence, features.energy)?;
        let overridden = self.mood.as_deref().map(str::trim).and_then(|m| m.parse::<Mood>().ok()) != Some(mood);
        let super_genre = match self.super_genre.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(label) => Some(label.parse::<SuperGenre>().ok()?),
        };
        let track = LabeledTrack {
            track_id: self.track_id,
            track_name: self.track_name,
            artists: self.artists,
            track_genre: self.track_genre.filter(|g| !g.trim().is_empty()),
            mood,
            super_genre,
            features,
        };
        Some((track, overridden))
    }
}

/// Write `path` through a temp file in the same directory, so readers never
/// see a half-written file and a failed run leaves the old file in place.
pub(crate) fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    write(tmp.as_file_mut())?;
    tmp.as_file_mut().flush()?;
    tmp.persist(path)
        .with_context(|| format!("Failed to move finished file into {}", path.display()))?;
    Ok(())
}

/// Persist the processed dataset as CSV.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_processed(path: &Path, tracks: &[LabeledTrack]) -> Result<()> {
    write_atomically(path, |file| {
        let mut writer = csv::Writer::from_writer(file);
        for track in tracks {
            writer
                .serialize(ProcessedRow::from(track))
                .with_context(|| format!("Failed to write row for track {}", track.track_id))?;
        }
        writer.flush()?;
        Ok(())
    })?;
    info!("Saved {} processed tracks to {}", tracks.len(), path.display());
    Ok(())
}

/// Load the processed dataset.
///
/// Mood is recomputed from valence and energy for every row, whatever the
/// stored `mood` cell says. Rows with a missing feature or an unknown
/// super-genre label are skipped and counted.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or lacks `track_id` or a
/// feature column.
pub fn read_processed(path: &Path) -> Result<Vec<LabeledTrack>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open processed dataset {}", path.display()))?;

    let headers = reader.headers()?.clone();
    for column in FEATURE_NAMES.iter().chain(&["track_id"]) {
        if !headers.iter().any(|h| h == *column) {
            anyhow::bail!(
                "Processed dataset {} has no '{column}' column. Re-run `valora merge`.",
                path.display()
            );
        }
    }

    let mut tracks = Vec::new();
    let mut skipped = 0usize;
    let mut relabeled = 0usize;
    for (line, row) in reader.deserialize::<ProcessedRow>().enumerate() {
        match row {
            Ok(row) => match row.into_track() {
                Some((track, overridden)) => {
                    relabeled += usize::from(overridden);
                    tracks.push(track);
                }
                None => skipped += 1,
            },
            Err(e) => {
                debug!("Unreadable processed row {}: {e}", line + 2);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {skipped} incomplete rows in {}", path.display());
    }
    if relabeled > 0 {
        info!("Recomputed a missing or stale mood for {relabeled} rows in {}", path.display());
    }
    info!("Loaded {} processed tracks from {}", tracks.len(), path.display());
    Ok(tracks)
}

/// Value counts of mood labels.
#[must_use]
pub fn mood_counts(tracks: &[LabeledTrack]) -> BTreeMap<Mood, usize> {
    let mut counts = BTreeMap::new();
    for track in tracks {
        *counts.entry(track.mood).or_insert(0) += 1;
    }
    counts
}

/// Value counts of heuristic super-genres. Unlabeled tracks are not counted.
#[must_use]
pub fn genre_counts(tracks: &[LabeledTrack]) -> BTreeMap<SuperGenre, usize> {
    let mut counts = BTreeMap::new();
    for genre in tracks.iter().filter_map(|t| t.super_genre) {
        *counts.entry(genre).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
pub(crate) fn sample_track(id: &str, valence: f64, energy: f64, genre: Option<&str>) -> LabeledTrack {
    use crate::features::sample_features;
    use crate::genre::super_genre_from_raw;

    LabeledTrack {
        track_id: id.to_string(),
        track_name: format!("Song {id}"),
        artists: format!("Artist {id}"),
        track_genre: genre.map(str::to_string),
        mood: quadrant_mood(valence, energy).unwrap(),
        super_genre: super_genre_from_raw(genre),
        features: sample_features(valence, energy),
    }
}
