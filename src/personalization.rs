//! # Personalization Sets
//!
//! The track ids one user is known to like, for one request. Assembled from
//! a static seed export unioned with the user's saved tracks fetched live.
//! A failed live fetch is not an error: the request proceeds on the seed.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::path::Path;

/// How many saved tracks a live fetch asks for.
pub const LIVE_FETCH_LIMIT: usize = 50;

/// Default seed column holding `scheme:kind:id` resource URIs.
pub const DEFAULT_SEED_COLUMN: &str = "Track URI";

/// Track id from a composite `scheme:kind:id` URI: the third segment.
///
/// ```
/// use valora::personalization::track_id_from_uri;
///
/// assert_eq!(track_id_from_uri("spotify:track:4uLU6hMCjMI75M1A2tKUQC"), Some("4uLU6hMCjMI75M1A2tKUQC"));
/// assert_eq!(track_id_from_uri("not-a-uri"), None);
/// ```
#[must_use]
pub fn track_id_from_uri(uri: &str) -> Option<&str> {
    uri.trim().split(':').nth(2).map(str::trim).filter(|id| !id.is_empty())
}

/// Read the seed ids from a tabular export.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or has no `column`.
pub fn load_seed_file(path: &Path, column: &str) -> Result<HashSet<String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open personalization seed {}", path.display()))?;
    let position = reader
        .headers()?
        .iter()
        .position(|h| h.trim() == column)
        .with_context(|| format!("Personalization seed {} has no '{column}' column", path.display()))?;

    let mut ids = HashSet::new();
    let mut malformed = 0usize;
    for record in reader.records() {
        match record.ok().as_ref().and_then(|r| r.get(position)).and_then(track_id_from_uri) {
            Some(id) => {
                ids.insert(id.to_string());
            }
            None => malformed += 1,
        }
    }
    if malformed > 0 {
        warn!("Skipped {malformed} seed rows without a usable track URI");
    }
    info!("Loaded {} seed track ids from {}", ids.len(), path.display());
    Ok(ids)
}

/// Live source of a user's saved tracks.
pub trait LibrarySource {
    /// Up to `limit` saved track ids, most recent first.
    fn saved_track_ids(&self, limit: usize) -> Result<Vec<String>>;
}

/// Per-request set of favored track ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonalizationSet {
    ids: HashSet<String>,
}

impl PersonalizationSet {
    #[must_use]
    pub fn new(ids: HashSet<String>) -> Self {
        Self { ids }
    }

    /// Seed ids plus whatever `live` returns. Falls back to the seed alone
    /// when there is no live source or it fails.
    #[must_use]
    pub fn assemble(seed: &HashSet<String>, live: Option<&dyn LibrarySource>) -> Self {
        let mut ids = seed.clone();
        if let Some(source) = live {
            match source.saved_track_ids(LIVE_FETCH_LIMIT) {
                Ok(fetched) => {
                    let before = ids.len();
                    ids.extend(fetched.into_iter().filter(|id| !id.trim().is_empty()));
                    debug!("Live library added {} ids to the seed", ids.len() - before);
                }
                Err(e) => warn!("Live library fetch failed, using the static seed only: {e:#}"),
            }
        }
        Self { ids }
    }

    #[must_use]
    pub fn contains(&self, track_id: &str) -> bool {
        self.ids.contains(track_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<String> for PersonalizationSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self { ids: iter.into_iter().collect() }
    }
}
