//! # Configuration Module
//!
//! File locations and tunables for every pipeline stage, plus the
//! platform data directory they default into.
//!
//! ## Data Storage
//!
//! Valora keeps its processed dataset, model bundles and track database in
//! the platform-standard data directory:
//! - Linux: `~/.local/share/valora/`
//! - macOS: `~/Library/Application Support/valora/`
//! - Windows: `%APPDATA%\valora\`
//!
//! ## Config Files
//!
//! Any field can be overridden from a JSON file passed with `--config`.
//! Missing keys keep their defaults:
//!
//! ```json
//! {
//!   "database_path": "valora_database.csv",
//!   "selector": { "target_count": 10 },
//!   "train": { "seed": 7 }
//! }
//! ```

use crate::merge::{ColumnMap, SourceSpec};
use crate::ml::{Algorithm, ModelBundle, ModelKind};
use crate::personalization::DEFAULT_SEED_COLUMN;
use crate::recommend::SelectorConfig;
use crate::train::TrainConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Platform data directory for Valora, without creating it.
fn data_dir_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;
    Ok(data_dir.join("valora"))
}

/// Returns the platform-appropriate data directory for Valora, creating it
/// if needed.
///
/// # Errors
///
/// This function will return an error if:
/// - The system data directory cannot be determined
/// - The valora subdirectory cannot be created due to permissions
///
/// # Examples
///
/// ```no_run
/// use valora::config::get_data_dir;
///
/// let dir = get_data_dir()?;
/// println!("Data location: {}", dir.display());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn get_data_dir() -> Result<PathBuf> {
    let valora_dir = data_dir_path()?;
    fs::create_dir_all(&valora_dir).with_context(|| {
        format!(
            "Failed to create Valora data directory at {}. Please check file permissions.",
            valora_dir.display()
        )
    })?;
    Ok(valora_dir)
}

/// Everything the pipeline and the selector need to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Feature sources, merged in this order.
    pub sources: Vec<SourceSpec>,
    /// Merged, mood-labeled dataset with features.
    pub processed_path: PathBuf,
    /// Where bundles and evaluation reports are written.
    pub models_dir: PathBuf,
    /// Canonical serving database.
    pub database_path: PathBuf,
    /// Which genre bundle the builder loads.
    pub genre_algorithm: Algorithm,
    /// Static personalization export. Optional.
    pub seed_path: Option<PathBuf>,
    pub seed_column: String,
    pub selector: SelectorConfig,
    pub train: TrainConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let base = data_dir_path().unwrap_or_else(|_| PathBuf::from("."));
        Self::rooted_at(&base)
    }
}

impl PipelineConfig {
    /// Default layout with every file under `base`.
    #[must_use]
    pub fn rooted_at(base: &Path) -> Self {
        Self {
            sources: vec![
                SourceSpec {
                    name: "spotify_huggingface".to_string(),
                    path: base.join("spotify_huggingface.csv"),
                    columns: ColumnMap::canonical(),
                },
                SourceSpec {
                    name: "data_moods".to_string(),
                    path: base.join("data_moods.csv"),
                    columns: ColumnMap::short(),
                },
            ],
            processed_path: base.join("combined_processed.csv"),
            models_dir: base.join("models"),
            database_path: base.join("valora_database.csv"),
            genre_algorithm: Algorithm::Forest,
            seed_path: Some(base.join("Liked_Songs_Spotify.csv")),
            seed_column: DEFAULT_SEED_COLUMN.to_string(),
            selector: SelectorConfig::default(),
            train: TrainConfig::default(),
        }
    }

    /// Read a JSON config file. Absent keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON for
    /// this layout.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Config from `path` if given, defaults otherwise.
    ///
    /// # Errors
    ///
    /// Same as [`PipelineConfig::load`] when a path is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Bundle file for a model kind and algorithm.
    #[must_use]
    pub fn bundle_path(&self, kind: ModelKind, algorithm: Algorithm) -> PathBuf {
        ModelBundle::path_in(&self.models_dir, kind, algorithm)
    }

    /// The bundle the builder uses to fill missing genres.
    #[must_use]
    pub fn genre_bundle_path(&self) -> PathBuf {
        self.bundle_path(ModelKind::Genre, self.genre_algorithm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_get_data_dir_creates_directory() {
        let dir = get_data_dir().expect("data directory should resolve");
        assert!(dir.exists());
        assert!(dir.is_dir());
        assert_eq!(dir.file_name().unwrap(), "valora");
    }

    #[test]
    fn test_rooted_layout() {
        let base = Path::new("/srv/valora");
        let config = PipelineConfig::rooted_at(base);
        assert_eq!(config.database_path, base.join("valora_database.csv"));
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[1].columns, ColumnMap::short());
        assert_eq!(config.genre_bundle_path(), base.join("models").join("genre_forest_bundle.json"));
        assert_eq!(config.selector.target_count, 20);
        assert_eq!(config.selector.personal_quota, 8);
        assert_eq!(config.train.seed, 42);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("valora.json");
        fs::write(
            &path,
            r#"{ "database_path": "db.csv", "selector": { "target_count": 5 }, "genre_algorithm": "svm" }"#,
        )
        .unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.database_path, PathBuf::from("db.csv"));
        assert_eq!(config.selector.target_count, 5);
        assert_eq!(config.selector.personal_quota, 8);
        assert_eq!(config.genre_algorithm, Algorithm::Svm);
        assert_eq!(config.train, TrainConfig::default());
    }

    #[test]
    fn test_round_trip_through_json() {
        let config = PipelineConfig::rooted_at(Path::new("data"));
        let text = serde_json::to_string_pretty(&config).unwrap();
        let back: PipelineConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_bad_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let err = PipelineConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }
}
