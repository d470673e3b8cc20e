//! # Feature Schema
//!
//! The fixed acoustic feature vector shared by every stage: merging,
//! labeling, training and inference all speak in terms of [`FeatureVector`]
//! and the column order in [`FEATURE_NAMES`].

use serde::{Deserialize, Serialize};

/// Canonical column names, in the order rows are projected for the models.
pub const FEATURE_NAMES: [&str; 11] = [
    "danceability",
    "energy",
    "key",
    "loudness",
    "speechiness",
    "acousticness",
    "instrumentalness",
    "liveness",
    "valence",
    "tempo",
    "time_signature",
];

/// Features that define the mood label. A mood model must never see them.
pub const MOOD_DEFINING_FEATURES: [&str; 2] = ["valence", "energy"];

/// One track's acoustic description.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub danceability: f64,
    pub energy: f64,
    pub key: f64,
    pub loudness: f64,
    pub speechiness: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
    pub valence: f64,
    pub tempo: f64,
    pub time_signature: f64,
}

impl FeatureVector {
    /// Build from values in [`FEATURE_NAMES`] order. Returns `None` if any
    /// value is missing or not finite.
    #[must_use]
    pub fn from_ordered(values: &[Option<f64>]) -> Option<Self> {
        if values.len() != FEATURE_NAMES.len() {
            return None;
        }
        let mut v = [0.0; 11];
        for (slot, value) in v.iter_mut().zip(values) {
            match value {
                Some(x) if x.is_finite() => *slot = *x,
                _ => return None,
            }
        }
        Some(Self {
            danceability: v[0],
            energy: v[1],
            key: v[2],
            loudness: v[3],
            speechiness: v[4],
            acousticness: v[5],
            instrumentalness: v[6],
            liveness: v[7],
            valence: v[8],
            tempo: v[9],
            time_signature: v[10],
        })
    }

    /// Value of a feature by its canonical name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        let value = match name {
            "danceability" => self.danceability,
            "energy" => self.energy,
            "key" => self.key,
            "loudness" => self.loudness,
            "speechiness" => self.speechiness,
            "acousticness" => self.acousticness,
            "instrumentalness" => self.instrumentalness,
            "liveness" => self.liveness,
            "valence" => self.valence,
            "tempo" => self.tempo,
            "time_signature" => self.time_signature,
            _ => return None,
        };
        Some(value)
    }

    /// All values in [`FEATURE_NAMES`] order.
    #[must_use]
    pub fn to_ordered(&self) -> [f64; 11] {
        [
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
        ]
    }

    /// Names of features whose value lies outside its semantic range.
    #[must_use]
    pub fn out_of_range(&self) -> Vec<&'static str> {
        FEATURE_NAMES
            .iter()
            .zip(self.to_ordered())
            .filter(|(name, value)| !in_range(name, *value))
            .map(|(name, _)| *name)
            .collect()
    }
}

fn in_range(name: &str, value: f64) -> bool {
    match name {
        "loudness" => (-60.0..=0.0).contains(&value),
        "key" => (0.0..=11.0).contains(&value) && value.fract() == 0.0,
        "tempo" => value > 0.0,
        "time_signature" => (1.0..=7.0).contains(&value) && value.fract() == 0.0,
        _ => (0.0..=1.0).contains(&value),
    }
}

/// Which columns a model is trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSet {
    /// All eleven features.
    Full,
    /// Everything except valence and energy.
    MoodSafe,
}

impl FeatureSet {
    #[must_use]
    pub fn names(self) -> Vec<&'static str> {
        match self {
            Self::Full => FEATURE_NAMES.to_vec(),
            Self::MoodSafe => FEATURE_NAMES
                .iter()
                .copied()
                .filter(|name| !MOOD_DEFINING_FEATURES.contains(name))
                .collect(),
        }
    }

    #[must_use]
    pub fn len(self) -> usize {
        self.names().len()
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Numeric row for this feature set, in canonical order.
    #[must_use]
    pub fn project(self, features: &FeatureVector) -> Vec<f64> {
        match self {
            Self::Full => features.to_ordered().to_vec(),
            Self::MoodSafe => FEATURE_NAMES
                .iter()
                .zip(features.to_ordered())
                .filter(|(name, _)| !MOOD_DEFINING_FEATURES.contains(name))
                .map(|(_, value)| value)
                .collect(),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_features(valence: f64, energy: f64) -> FeatureVector {
    FeatureVector {
        danceability: 0.6,
        energy,
        key: 5.0,
        loudness: -7.5,
        speechiness: 0.05,
        acousticness: 0.2,
        instrumentalness: 0.0,
        liveness: 0.1,
        valence,
        tempo: 120.0,
        time_signature: 4.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ordered_rejects_missing_and_non_finite() {
        let mut values: Vec<Option<f64>> = sample_features(0.5, 0.5)
            .to_ordered()
            .iter()
            .map(|v| Some(*v))
            .collect();
        assert!(FeatureVector::from_ordered(&values).is_some());

        values[3] = None;
        assert!(FeatureVector::from_ordered(&values).is_none());

        values[3] = Some(f64::NAN);
        assert!(FeatureVector::from_ordered(&values).is_none());

        assert!(FeatureVector::from_ordered(&values[..10]).is_none());
    }

    #[test]
    fn test_get_matches_ordered_layout() {
        let features = sample_features(0.3, 0.9);
        for (name, value) in FEATURE_NAMES.iter().zip(features.to_ordered()) {
            assert_eq!(features.get(name), Some(value));
        }
        assert_eq!(features.get("mood"), None);
    }

    #[test]
    fn test_mood_safe_excludes_label_defining_features() {
        let names = FeatureSet::MoodSafe.names();
        assert_eq!(names.len(), 9);
        assert!(!names.contains(&"valence"));
        assert!(!names.contains(&"energy"));
        assert_eq!(FeatureSet::Full.len(), 11);

        let row = FeatureSet::MoodSafe.project(&sample_features(0.11, 0.99));
        assert_eq!(row.len(), 9);
        assert!(!row.contains(&0.11));
        assert!(!row.contains(&0.99));
    }

    #[test]
    fn test_out_of_range_reports_offending_features() {
        let mut features = sample_features(0.5, 0.5);
        assert!(features.out_of_range().is_empty());

        features.loudness = 3.0;
        features.key = 12.0;
        features.valence = 1.5;
        let bad = features.out_of_range();
        assert_eq!(bad, vec!["key", "loudness", "valence"]);
    }
}
