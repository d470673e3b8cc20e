//! # Recommendation Enrichment
//!
//! Decorates selected track ids with display details from an external
//! lookup service. The service takes at most [`ENRICH_BATCH_LIMIT`] ids per
//! call, answers each batch with nullable entries in any order, and may
//! fail outright. None of that may reorder or fail the recommendation list:
//!
//! - a failed batch is skipped with a warning
//! - a null entry, or an entry for an id that was not asked for, is dropped
//! - the survivors come back in selector order

use crate::genre::SuperGenre;
use crate::recommend::Recommendation;
use anyhow::Result;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Largest batch the lookup service accepts.
pub const ENRICH_BATCH_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDetails {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub album_art: Option<String>,
    pub preview_url: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedRecommendation {
    #[serde(flatten)]
    pub details: TrackDetails,
    pub super_genre: SuperGenre,
}

/// External track-details service.
pub trait DetailsLookup {
    /// Details for up to [`ENRICH_BATCH_LIMIT`] ids. Entries may be `None`
    /// and need not follow the request order.
    fn lookup(&self, ids: &[String]) -> Result<Vec<Option<TrackDetails>>>;
}

/// Look up details for `selected` and return them in the same order.
pub fn enrich(selected: &[Recommendation], lookup: &dyn DetailsLookup) -> Vec<EnrichedRecommendation> {
    let position: HashMap<&str, usize> =
        selected.iter().enumerate().map(|(i, rec)| (rec.track_id.as_str(), i)).collect();
    let mut found: BTreeMap<usize, TrackDetails> = BTreeMap::new();
    let mut failed_batches = 0usize;

    for batch in selected.chunks(ENRICH_BATCH_LIMIT) {
        let ids: Vec<String> = batch.iter().map(|rec| rec.track_id.clone()).collect();
        match lookup.lookup(&ids) {
            Ok(entries) => {
                for details in entries.into_iter().flatten() {
                    match position.get(details.id.as_str()) {
                        Some(&i) => {
                            found.entry(i).or_insert(details);
                        }
                        None => debug!("Lookup returned unrequested track {}", details.id),
                    }
                }
            }
            Err(e) => {
                failed_batches += 1;
                warn!("Details lookup failed for a batch of {}: {e:#}", ids.len());
            }
        }
    }

    let missing = selected.len() - found.len();
    if missing > 0 {
        debug!("{missing} of {} recommendations had no details ({failed_batches} failed batches)", selected.len());
    }

    found
        .into_iter()
        .map(|(i, details)| EnrichedRecommendation { details, super_genre: selected[i].super_genre })
        .collect()
}

/// First artist of a raw multi-artist string, lowercased for matching.
///
/// ```
/// use valora::enrich::primary_artist;
///
/// assert_eq!(primary_artist("Daft Punk;Pharrell Williams"), "daft punk");
/// assert_eq!(primary_artist("Simon, Garfunkel"), "simon");
/// ```
#[must_use]
pub fn primary_artist(raw: &str) -> String {
    raw.split(';')
        .next()
        .and_then(|first| first.split(',').next())
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn rec(id: &str) -> Recommendation {
        Recommendation { track_id: id.to_string(), super_genre: SuperGenre::Metal }
    }

    fn details(id: &str) -> TrackDetails {
        TrackDetails {
            id: id.to_string(),
            name: format!("Name {id}"),
            artist: "Someone".to_string(),
            album_art: None,
            preview_url: None,
            url: Some(format!("https://example.invalid/{id}")),
        }
    }

    /// Answers in reverse order, nulls ids ending in `x`, fails the batch
    /// that starts with `fail`, and records batch sizes.
    struct ScrambledLookup {
        batches: RefCell<Vec<usize>>,
    }

    impl DetailsLookup for ScrambledLookup {
        fn lookup(&self, ids: &[String]) -> Result<Vec<Option<TrackDetails>>> {
            self.batches.borrow_mut().push(ids.len());
            if ids.first().is_some_and(|id| id.starts_with("fail")) {
                anyhow::bail!("service unavailable");
            }
            Ok(ids
                .iter()
                .rev()
                .map(|id| if id.ends_with('x') { None } else { Some(details(id)) })
                .chain(std::iter::once(Some(details("stranger"))))
                .collect())
        }
    }

    #[test]
    fn test_order_restored_and_nulls_dropped() {
        let selected = vec![rec("a"), rec("bx"), rec("c"), rec("d")];
        let lookup = ScrambledLookup { batches: RefCell::new(Vec::new()) };
        let enriched = enrich(&selected, &lookup);

        let ids: Vec<&str> = enriched.iter().map(|e| e.details.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "d"]);
        assert!(enriched.iter().all(|e| e.super_genre == SuperGenre::Metal));
    }

    #[test]
    fn test_batches_are_bounded_and_failures_skipped() {
        let mut selected: Vec<Recommendation> = (0..ENRICH_BATCH_LIMIT).map(|i| rec(&format!("fail{i}"))).collect();
        selected.extend((0..70).map(|i| rec(&format!("ok{i}"))));
        let lookup = ScrambledLookup { batches: RefCell::new(Vec::new()) };
        let enriched = enrich(&selected, &lookup);

        assert_eq!(*lookup.batches.borrow(), vec![50, 50, 20]);
        assert_eq!(enriched.len(), 70);
        assert_eq!(enriched[0].details.id, "ok0");
        assert_eq!(enriched[69].details.id, "ok69");
    }

    #[test]
    fn test_primary_artist() {
        assert_eq!(primary_artist("  Queen ; David Bowie"), "queen");
        assert_eq!(primary_artist(""), "");
    }

    #[test]
    fn test_enriched_item_serializes_flat() {
        let item = EnrichedRecommendation { details: details("a"), super_genre: SuperGenre::HipHop };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["id"], "a");
        assert_eq!(json["super_genre"], "Hip-Hop");
    }
}
