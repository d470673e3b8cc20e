//! # Source Merger
//!
//! Reads several tabular feature sources with different column names,
//! projects each onto the common layout, concatenates them in the order
//! given, and cleans the result:
//!
//! 1. duplicates by `track_id` are removed, first occurrence wins;
//! 2. rows missing any feature value are dropped;
//! 3. every surviving row gets its quadrant mood and heuristic super-genre.
//!
//! Deduplication runs before the completeness filter, so an incomplete first
//! occurrence still shadows a later complete duplicate.

use crate::dataset::LabeledTrack;
use crate::error::PipelineError;
use crate::features::{FeatureVector, FEATURE_NAMES};
use crate::genre::super_genre_from_raw;
use crate::mood::quadrant_mood;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Which source columns hold the identity and display fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub track_id: String,
    pub track_name: String,
    pub artists: String,
    /// Free-text genre column, if the source has one.
    #[serde(default)]
    pub track_genre: Option<String>,
}

impl ColumnMap {
    /// `track_id, track_name, artists, track_genre`
    #[must_use]
    pub fn canonical() -> Self {
        Self {
            track_id: "track_id".to_string(),
            track_name: "track_name".to_string(),
            artists: "artists".to_string(),
            track_genre: Some("track_genre".to_string()),
        }
    }

    /// `id, name, artist`, no genre column.
    #[must_use]
    pub fn short() -> Self {
        Self {
            track_id: "id".to_string(),
            track_name: "name".to_string(),
            artists: "artist".to_string(),
            track_genre: None,
        }
    }
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self::canonical()
    }
}

/// One configured input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub columns: ColumnMap,
}

/// A source row projected onto the common layout, not yet cleaned.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub track_id: String,
    pub track_name: String,
    pub artists: String,
    pub track_genre: Option<String>,
    /// Parsed values in [`FEATURE_NAMES`] order; `None` for blank or bad cells.
    pub features: Vec<Option<f64>>,
}

/// What happened during a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// `(source name, rows read)` in input order.
    pub rows_per_source: Vec<(String, usize)>,
    pub duplicates_removed: usize,
    pub incomplete_dropped: usize,
    /// Rows kept even though some feature is outside its usual range.
    pub out_of_range: usize,
    pub merged: usize,
}

/// Column positions resolved against one file's header.
struct ColumnIndex {
    track_id: usize,
    track_name: usize,
    artists: usize,
    track_genre: Option<usize>,
    features: Vec<usize>,
}

impl ColumnIndex {
    fn resolve(spec: &SourceSpec, headers: &csv::StringRecord) -> Result<Self, PipelineError> {
        let find = |column: &str| -> Result<usize, PipelineError> {
            headers
                .iter()
                .position(|h| h.trim() == column)
                .ok_or_else(|| PipelineError::MissingColumn {
                    source_name: spec.name.clone(),
                    column: column.to_string(),
                })
        };

        let track_genre = match &spec.columns.track_genre {
            Some(column) => Some(find(column)?),
            None => None,
        };
        let features = FEATURE_NAMES
            .iter()
            .map(|name| find(name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            track_id: find(&spec.columns.track_id)?,
            track_name: find(&spec.columns.track_name)?,
            artists: find(&spec.columns.artists)?,
            track_genre,
            features,
        })
    }
}

fn cell(record: &csv::StringRecord, index: usize) -> &str {
    record.get(index).map_or("", str::trim)
}

fn parse_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Read one source and project its rows.
///
/// # Errors
///
/// [`PipelineError::MissingSource`] if the file does not exist and
/// [`PipelineError::MissingColumn`] if any required column is absent.
pub fn read_source(spec: &SourceSpec) -> Result<Vec<SourceRow>> {
    if !spec.path.exists() {
        return Err(PipelineError::MissingSource {
            name: spec.name.clone(),
            path: spec.path.clone(),
        }
        .into());
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(&spec.path)
        .with_context(|| format!("Failed to open source '{}' at {}", spec.name, spec.path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of source '{}'", spec.name))?
        .clone();
    let columns = ColumnIndex::resolve(spec, &headers)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Malformed CSV in source '{}'", spec.name))?;
        let genre = columns
            .track_genre
            .map(|i| cell(&record, i))
            .filter(|g| !g.is_empty())
            .map(str::to_string);
        rows.push(SourceRow {
            track_id: cell(&record, columns.track_id).to_string(),
            track_name: cell(&record, columns.track_name).to_string(),
            artists: cell(&record, columns.artists).to_string(),
            track_genre: genre,
            features: columns
                .features
                .iter()
                .map(|&i| parse_number(cell(&record, i)))
                .collect(),
        });
    }

    info!("Loaded {} rows from source '{}'", rows.len(), spec.name);
    Ok(rows)
}

/// Merge already-projected sources. Pure; no I/O.
#[must_use]
pub fn merge_rows(sources: Vec<(String, Vec<SourceRow>)>) -> (Vec<LabeledTrack>, MergeReport) {
    let mut report = MergeReport::default();
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for (name, rows) in sources {
        report.rows_per_source.push((name, rows.len()));
        for row in rows {
            if row.track_id.is_empty() {
                report.incomplete_dropped += 1;
                continue;
            }
            if !seen.insert(row.track_id.clone()) {
                report.duplicates_removed += 1;
                continue;
            }
            let Some(features) = FeatureVector::from_ordered(&row.features) else {
                report.incomplete_dropped += 1;
                continue;
            };
            let Some(mood) = quadrant_mood(features.valence, features.energy) else {
                report.incomplete_dropped += 1;
                continue;
            };

            let odd = features.out_of_range();
            if !odd.is_empty() {
                debug!("Track {} has out-of-range features: {odd:?}", row.track_id);
                report.out_of_range += 1;
            }

            let super_genre = super_genre_from_raw(row.track_genre.as_deref());
            merged.push(LabeledTrack {
                track_id: row.track_id,
                track_name: row.track_name,
                artists: row.artists,
                track_genre: row.track_genre,
                mood,
                super_genre,
                features,
            });
        }
    }

    report.merged = merged.len();
    (merged, report)
}

/// Read every source, then merge. All sources are validated before any row
/// is merged, so a bad configuration fails without partial output.
///
/// # Errors
///
/// Returns an error if no sources are configured, or any error from
/// [`read_source`].
pub fn merge_sources(specs: &[SourceSpec]) -> Result<(Vec<LabeledTrack>, MergeReport)> {
    if specs.is_empty() {
        anyhow::bail!("No feature sources configured");
    }

    let sources = specs
        .iter()
        .map(|spec| read_source(spec).map(|rows| (spec.name.clone(), rows)))
        .collect::<Result<Vec<_>>>()?;

    let (tracks, report) = merge_rows(sources);

    info!(
        "Merged {} tracks ({} duplicates removed, {} incomplete rows dropped)",
        report.merged, report.duplicates_removed, report.incomplete_dropped
    );
    if report.out_of_range > 0 {
        warn!("{} merged tracks have features outside their usual range", report.out_of_range);
    }
    Ok((tracks, report))
}
