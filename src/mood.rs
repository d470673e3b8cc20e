//! # Quadrant Mood Labeling
//!
//! Moods are never learned. Every track's mood is a pure function of its
//! valence and energy, split at 0.5 on both axes:
//!
//! ```text
//!            energy < 0.5        energy >= 0.5
//! v >= 0.5   Calm/Peaceful       Happy/Energetic
//! v <  0.5   Sad/Melancholy      Angry/Tense
//! ```
//!
//! Exactly 0.5 always lands on the `>=` side.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The boundary on both axes.
pub const QUADRANT_SPLIT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Mood {
    #[serde(rename = "Happy/Energetic")]
    HappyEnergetic,
    #[serde(rename = "Calm/Peaceful")]
    CalmPeaceful,
    #[serde(rename = "Angry/Tense")]
    AngryTense,
    #[serde(rename = "Sad/Melancholy")]
    SadMelancholy,
}

impl Mood {
    pub const ALL: [Mood; 4] = [
        Mood::HappyEnergetic,
        Mood::CalmPeaceful,
        Mood::AngryTense,
        Mood::SadMelancholy,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HappyEnergetic => "Happy/Energetic",
            Self::CalmPeaceful => "Calm/Peaceful",
            Self::AngryTense => "Angry/Tense",
            Self::SadMelancholy => "Sad/Melancholy",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mood::ALL
            .into_iter()
            .find(|mood| mood.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown mood label: '{s}'"))
    }
}

/// Quadrant mood for a `(valence, energy)` pair.
///
/// Returns `None` when either input is NaN or infinite. Such tracks get no
/// label and are dropped downstream rather than guessed into a quadrant.
///
/// # Examples
///
/// ```
/// use valora::mood::{quadrant_mood, Mood};
///
/// assert_eq!(quadrant_mood(0.5, 0.5), Some(Mood::HappyEnergetic));
/// assert_eq!(quadrant_mood(0.9, 0.1), Some(Mood::CalmPeaceful));
/// assert_eq!(quadrant_mood(f64::NAN, 0.1), None);
/// ```
#[must_use]
pub fn quadrant_mood(valence: f64, energy: f64) -> Option<Mood> {
    if !valence.is_finite() || !energy.is_finite() {
        return None;
    }
    let positive = valence >= QUADRANT_SPLIT;
    let energetic = energy >= QUADRANT_SPLIT;
    let mood = match (positive, energetic) {
        (true, true) => Mood::HappyEnergetic,
        (true, false) => Mood::CalmPeaceful,
        (false, true) => Mood::AngryTense,
        (false, false) => Mood::SadMelancholy,
    };
    Some(mood)
}

/// Same rule over raw text cells, as found in tabular sources.
#[must_use]
pub fn quadrant_mood_from_text(valence: &str, energy: &str) -> Option<Mood> {
    let valence = valence.trim().parse::<f64>().ok()?;
    let energy = energy.trim().parse::<f64>().ok()?;
    quadrant_mood(valence, energy)
}
