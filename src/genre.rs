//! # Super-Genre Labeling
//!
//! Collapses free-text genre strings into a small closed set of buckets.
//! This is the heuristic tier; tracks without any genre text are left
//! unlabeled here and get their bucket from the trained genre model when
//! the canonical database is built.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SuperGenre {
    #[serde(rename = "Rock/Alternative")]
    RockAlternative,
    #[serde(rename = "Electronic/Dance")]
    ElectronicDance,
    #[serde(rename = "Pop/R&B/Soul")]
    PopRnbSoul,
    #[serde(rename = "Hip-Hop")]
    HipHop,
    #[serde(rename = "Jazz/Blues/Reggae")]
    JazzBluesReggae,
    #[serde(rename = "Classical/Acoustic")]
    ClassicalAcoustic,
    Metal,
    Other,
}

impl SuperGenre {
    pub const ALL: [SuperGenre; 8] = [
        SuperGenre::RockAlternative,
        SuperGenre::ElectronicDance,
        SuperGenre::PopRnbSoul,
        SuperGenre::HipHop,
        SuperGenre::JazzBluesReggae,
        SuperGenre::ClassicalAcoustic,
        SuperGenre::Metal,
        SuperGenre::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RockAlternative => "Rock/Alternative",
            Self::ElectronicDance => "Electronic/Dance",
            Self::PopRnbSoul => "Pop/R&B/Soul",
            Self::HipHop => "Hip-Hop",
            Self::JazzBluesReggae => "Jazz/Blues/Reggae",
            Self::ClassicalAcoustic => "Classical/Acoustic",
            Self::Metal => "Metal",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for SuperGenre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SuperGenre {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SuperGenre::ALL
            .into_iter()
            .find(|genre| genre.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown super-genre label: '{s}'"))
    }
}

/// Keyword table, checked top to bottom. First bucket with a matching
/// substring wins.
const KEYWORD_TABLE: &[(SuperGenre, &[&str])] = &[
    (SuperGenre::RockAlternative, &["rock", "punk", "alternative", "grunge", "indie"]),
    (
        SuperGenre::ElectronicDance,
        &["electronic", "house", "techno", "trance", "edm", "dance", "dubstep"],
    ),
    (SuperGenre::PopRnbSoul, &["pop", "r-n-b", "soul", "funk"]),
    (SuperGenre::HipHop, &["hip-hop", "rap"]),
    (SuperGenre::JazzBluesReggae, &["jazz", "blues", "reggae"]),
    (SuperGenre::ClassicalAcoustic, &["classical", "acoustic", "ambient", "piano"]),
    (SuperGenre::Metal, &["metal"]),
];

/// Super-genre for a raw genre string.
///
/// `None` means *unlabeled*: there was no genre text at all (missing or
/// blank). Text that matches no keyword is [`SuperGenre::Other`].
///
/// # Examples
///
/// ```
/// use valora::genre::{super_genre_from_raw, SuperGenre};
///
/// assert_eq!(super_genre_from_raw(Some("ROCK")), Some(SuperGenre::RockAlternative));
/// assert_eq!(super_genre_from_raw(Some("k-pop")), Some(SuperGenre::PopRnbSoul));
/// assert_eq!(super_genre_from_raw(Some("polka-ish")), Some(SuperGenre::Other));
/// assert_eq!(super_genre_from_raw(Some("")), None);
/// assert_eq!(super_genre_from_raw(None), None);
/// ```
#[must_use]
pub fn super_genre_from_raw(raw: Option<&str>) -> Option<SuperGenre> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    let genre = raw.to_lowercase();
    let bucket = KEYWORD_TABLE
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| genre.contains(keyword)))
        .map_or(SuperGenre::Other, |(bucket, _)| *bucket);
    Some(bucket)
}
