//! # Recommendation Selector
//!
//! Picks a bounded list of tracks for one mood:
//!
//! 1. Keep the tracks labeled with the requested mood
//! 2. Split them into personalized matches and the general pool
//! 3. Sample up to the personal quota from the matches
//! 4. Fill the rest of the target count from the general pool
//!
//! Sampling is without replacement and every sample size is clamped to its
//! population first, so a short pool yields a short list rather than an
//! error. Personalized picks always come first, in sampled order.
//!
//! The selector only borrows the database and owns its per-request state,
//! so any number of requests can run against one shared database.

use crate::database::{CanonicalTrack, TrackDatabase};
use crate::genre::SuperGenre;
use crate::mood::Mood;
use crate::personalization::PersonalizationSet;
use log::debug;
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Selection sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub target_count: usize,
    /// Most personalized picks allowed in one list.
    pub personal_quota: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self { target_count: 20, personal_quota: 8 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub track_id: String,
    pub super_genre: SuperGenre,
}

impl From<&CanonicalTrack> for Recommendation {
    fn from(track: &CanonicalTrack) -> Self {
        Self { track_id: track.track_id.clone(), super_genre: track.super_genre }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecommendationResult {
    pub recommendations: Vec<Recommendation>,
    pub message: String,
    pub personalized_count: usize,
    pub general_count: usize,
}

fn summary(mood: &str, personalized: usize, general: usize, mood_empty: bool) -> String {
    let total = personalized + general;
    if mood_empty {
        format!("No songs found for mood \"{mood}\".")
    } else if total == 0 {
        "No songs found.".to_string()
    } else if personalized > 0 {
        format!("Here are {total} songs for you ({personalized} from your taste, {general} new):")
    } else {
        format!("Here are {total} songs from our library for you:")
    }
}

/// Select recommendations for `mood`.
///
/// An unknown mood name behaves like a mood with no tracks.
///
/// # Examples
///
/// ```no_run
/// use valora::database::TrackDatabase;
/// use valora::personalization::PersonalizationSet;
/// use valora::recommend::{select, SelectorConfig};
///
/// let db = TrackDatabase::load(std::path::Path::new("valora_database.csv"))?;
/// let personal = PersonalizationSet::default();
/// let result = select(&db, "Calm/Peaceful", &personal, &SelectorConfig::default(), &mut rand::thread_rng());
/// println!("{}", result.message);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn select<R: Rng + ?Sized>(
    db: &TrackDatabase,
    mood: &str,
    personal: &PersonalizationSet,
    config: &SelectorConfig,
    rng: &mut R,
) -> RecommendationResult {
    let candidates: Vec<&CanonicalTrack> = match mood.parse::<Mood>() {
        Ok(mood) => db.with_mood(mood).collect(),
        Err(_) => {
            debug!("Unknown mood requested: {mood:?}");
            Vec::new()
        }
    };
    if candidates.is_empty() {
        return RecommendationResult {
            recommendations: Vec::new(),
            message: summary(mood, 0, 0, true),
            personalized_count: 0,
            general_count: 0,
        };
    }

    let (matches, pool): (Vec<&CanonicalTrack>, Vec<&CanonicalTrack>) =
        candidates.into_iter().partition(|track| personal.contains(&track.track_id));

    let n_personal = config.personal_quota.min(matches.len()).min(config.target_count);
    let n_general = (config.target_count - n_personal).min(pool.len());

    let mut recommendations = Vec::with_capacity(n_personal + n_general);
    recommendations.extend(index::sample(rng, matches.len(), n_personal).into_iter().map(|i| Recommendation::from(matches[i])));
    recommendations.extend(index::sample(rng, pool.len(), n_general).into_iter().map(|i| Recommendation::from(pool[i])));

    debug!(
        "Selected {n_personal} of {} matches and {n_general} of {} general tracks for {mood}",
        matches.len(),
        pool.len()
    );

    RecommendationResult {
        recommendations,
        message: summary(mood, n_personal, n_general, false),
        personalized_count: n_personal,
        general_count: n_general,
    }
}
