//! # Canonical Track Database
//!
//! The serving-time record set: one row per track with its identity,
//! display fields and the two labels the selector filters on. Features are
//! not kept; nothing after the builder needs them.
//!
//! ## On-disk format
//!
//! A flat CSV with the columns `track_id, track_name, artists, app_mood,
//! super_genre`, written atomically.
//!
//! ## Sharing
//!
//! A loaded [`TrackDatabase`] is never mutated. Wrap it in an `Arc` and
//! hand it to as many concurrent requests as needed; the selector only
//! ever borrows it.

use crate::dataset::write_atomically;
use crate::genre::SuperGenre;
use crate::mood::Mood;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Columns every canonical database file must carry.
pub const DATABASE_COLUMNS: [&str; 5] = ["track_id", "track_name", "artists", "app_mood", "super_genre"];

/// One fully labeled track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalTrack {
    pub track_id: String,
    pub track_name: String,
    pub artists: String,
    pub mood: Mood,
    pub super_genre: SuperGenre,
}

#[derive(Debug, Serialize, Deserialize)]
struct CanonicalRow {
    track_id: String,
    track_name: String,
    artists: String,
    app_mood: String,
    super_genre: String,
}

impl From<&CanonicalTrack> for CanonicalRow {
    fn from(track: &CanonicalTrack) -> Self {
        Self {
            track_id: track.track_id.clone(),
            track_name: track.track_name.clone(),
            artists: track.artists.clone(),
            app_mood: track.mood.to_string(),
            super_genre: track.super_genre.to_string(),
        }
    }
}

impl CanonicalRow {
    fn into_track(self) -> Option<CanonicalTrack> {
        if self.track_id.trim().is_empty() {
            return None;
        }
        Some(CanonicalTrack {
            mood: self.app_mood.trim().parse().ok()?,
            super_genre: self.super_genre.trim().parse().ok()?,
            track_id: self.track_id,
            track_name: self.track_name,
            artists: self.artists,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrackDatabase {
    tracks: Vec<CanonicalTrack>,
    by_id: HashMap<String, usize>,
    by_mood: HashMap<Mood, Vec<usize>>,
}

impl TrackDatabase {
    /// Index `tracks`. A repeated `track_id` keeps its first row.
    #[must_use]
    pub fn from_tracks(tracks: Vec<CanonicalTrack>) -> Self {
        let mut db = Self::default();
        let mut duplicates = 0usize;
        for track in tracks {
            if db.by_id.contains_key(&track.track_id) {
                duplicates += 1;
                continue;
            }
            let index = db.tracks.len();
            db.by_id.insert(track.track_id.clone(), index);
            db.by_mood.entry(track.mood).or_default().push(index);
            db.tracks.push(track);
        }
        if duplicates > 0 {
            warn!("Ignored {duplicates} duplicate track ids");
        }
        db
    }

    /// Load the canonical database. Failure here is fatal for serving.
    ///
    /// Rows with a blank id or an unknown label are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or lacks one of
    /// [`DATABASE_COLUMNS`].
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open track database {}. Run `valora build` first.", path.display()))?;

        let headers = reader.headers()?.clone();
        if let Some(column) = DATABASE_COLUMNS.iter().find(|c| !headers.iter().any(|h| h == **c)) {
            anyhow::bail!("Track database {} has no '{column}' column", path.display());
        }

        let mut tracks = Vec::new();
        let mut skipped = 0usize;
        for (line, row) in reader.deserialize::<CanonicalRow>().enumerate() {
            match row.map(CanonicalRow::into_track) {
                Ok(Some(track)) => tracks.push(track),
                Ok(None) => skipped += 1,
                Err(e) => {
                    debug!("Unreadable database row {}: {e}", line + 2);
                    skipped += 1;
                }
            }
        }
        if skipped > 0 {
            warn!("Skipped {skipped} database rows with a blank id or unknown label");
        }

        let db = Self::from_tracks(tracks);
        info!("Loaded {} tracks from {}", db.len(), path.display());
        Ok(db)
    }

    /// Replace `path` with the database in one atomic rename.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomically(path, |file| {
            let mut writer = csv::Writer::from_writer(file);
            for track in &self.tracks {
                writer.serialize(CanonicalRow::from(track))?;
            }
            writer.flush()?;
            Ok(())
        })
        .with_context(|| format!("Failed to save track database to {}", path.display()))?;
        info!("Saved {} tracks to {}", self.len(), path.display());
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// All tracks in file order.
    #[must_use]
    pub fn tracks(&self) -> &[CanonicalTrack] {
        &self.tracks
    }

    #[must_use]
    pub fn get(&self, track_id: &str) -> Option<&CanonicalTrack> {
        self.by_id.get(track_id).map(|&i| &self.tracks[i])
    }

    /// Tracks labeled `mood`, in file order.
    pub fn with_mood(&self, mood: Mood) -> impl Iterator<Item = &CanonicalTrack> + '_ {
        self.by_mood
            .get(&mood)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|&i| &self.tracks[i])
    }

    #[must_use]
    pub fn mood_distribution(&self) -> BTreeMap<Mood, usize> {
        Mood::ALL
            .into_iter()
            .map(|mood| (mood, self.by_mood.get(&mood).map_or(0, Vec::len)))
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    #[must_use]
    pub fn genre_distribution(&self) -> BTreeMap<SuperGenre, usize> {
        let mut counts = BTreeMap::new();
        for track in &self.tracks {
            *counts.entry(track.super_genre).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
pub(crate) fn canonical(id: &str, mood: Mood, genre: SuperGenre) -> CanonicalTrack {
    CanonicalTrack {
        track_id: id.to_string(),
        track_name: format!("Song {id}"),
        artists: format!("Artist {id}"),
        mood,
        super_genre: genre,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    #[test]
    fn test_first_duplicate_wins() {
        let db = TrackDatabase::from_tracks(vec![
            canonical("a", Mood::HappyEnergetic, SuperGenre::Metal),
            canonical("a", Mood::SadMelancholy, SuperGenre::Other),
            canonical("b", Mood::SadMelancholy, SuperGenre::HipHop),
        ]);
        assert_eq!(db.len(), 2);
        assert_eq!(db.get("a").unwrap().super_genre, SuperGenre::Metal);
        assert_eq!(db.with_mood(Mood::SadMelancholy).count(), 1);
        assert_eq!(db.with_mood(Mood::CalmPeaceful).count(), 0);
    }

    #[test]
    fn test_save_and_load_preserve_invariants() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("valora_database.csv");
        let tracks: Vec<CanonicalTrack> = (0..40)
            .map(|i| {
                let mood = Mood::ALL[i % 4];
                let genre = SuperGenre::ALL[i % 8];
                canonical(&format!("id{i}"), mood, genre)
            })
            .collect();
        let db = TrackDatabase::from_tracks(tracks);
        db.save(&path).unwrap();

        let header = std::fs::read_to_string(&path).unwrap();
        assert!(header.starts_with("track_id,track_name,artists,app_mood,super_genre"));

        let loaded = TrackDatabase::load(&path).unwrap();
        assert_eq!(loaded.len(), 40);
        assert_eq!(loaded.tracks(), db.tracks());
        let ids: HashSet<&str> = loaded.tracks().iter().map(|t| t.track_id.as_str()).collect();
        assert_eq!(ids.len(), 40);
        assert_eq!(loaded.mood_distribution(), db.mood_distribution());
        assert_eq!(loaded.genre_distribution().values().sum::<usize>(), 40);
    }

    #[test]
    fn test_load_skips_unknown_labels() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.csv");
        std::fs::write(
            &path,
            "track_id,track_name,artists,app_mood,super_genre\n\
             x1,One,A,Happy/Energetic,Metal\n\
             x2,Two,B,Happy/Energetic,\n\
             x3,Three,C,Gloomy,Metal\n\
             ,Four,D,Calm/Peaceful,Other\n\
             x1,Dup,E,Calm/Peaceful,Other\n",
        )
        .unwrap();

        let db = TrackDatabase::load(&path).unwrap();
        assert_eq!(db.len(), 1);
        assert_eq!(db.get("x1").unwrap().track_name, "One");
    }

    #[test]
    fn test_load_rejects_missing_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.csv");
        std::fs::write(&path, "track_id,track_name,artists,mood,super_genre\nx,a,b,Happy/Energetic,Metal\n").unwrap();
        let err = TrackDatabase::load(&path).unwrap_err();
        assert!(err.to_string().contains("app_mood"));
    }

    #[test]
    fn test_missing_file_fails() {
        assert!(TrackDatabase::load(Path::new("/nonexistent/valora.csv")).is_err());
    }
}
