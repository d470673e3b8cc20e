//! # Serving Context
//!
//! Explicit start-up step for the request path. Loading the track database
//! happens once, here, and a failure is fatal. The personalization seed is
//! best effort: a missing or unreadable seed file only means an empty seed.
//!
//! The context is immutable after loading. Requests share it behind an
//! `Arc` and build their own personalization set and RNG.

use crate::config::PipelineConfig;
use crate::database::TrackDatabase;
use crate::personalization::{load_seed_file, LibrarySource, PersonalizationSet};
use crate::recommend::{select, RecommendationResult, SelectorConfig};
use anyhow::{Context, Result};
use log::{info, warn};
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ServeContext {
    database: Arc<TrackDatabase>,
    seed: HashSet<String>,
    selector: SelectorConfig,
}

impl ServeContext {
    #[must_use]
    pub fn new(database: Arc<TrackDatabase>, seed: HashSet<String>, selector: SelectorConfig) -> Self {
        Self { database, seed, selector }
    }

    /// Load the database and the personalization seed named by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the track database cannot be loaded. A missing
    /// or unreadable seed file only logs a warning and leaves the seed empty.
    pub fn load(config: &PipelineConfig) -> Result<Self> {
        let database = TrackDatabase::load(&config.database_path).context("Cannot serve without a track database")?;
        if database.is_empty() {
            warn!("Track database {} is empty", config.database_path.display());
        }

        let seed = match &config.seed_path {
            Some(path) if path.exists() => load_seed_file(path, &config.seed_column).unwrap_or_else(|e| {
                warn!("Ignoring personalization seed: {e:#}");
                HashSet::new()
            }),
            Some(path) => {
                info!("No personalization seed at {}", path.display());
                HashSet::new()
            }
            None => HashSet::new(),
        };

        Ok(Self::new(Arc::new(database), seed, config.selector))
    }

    #[must_use]
    pub fn database(&self) -> &Arc<TrackDatabase> {
        &self.database
    }

    #[must_use]
    pub fn seed(&self) -> &HashSet<String> {
        &self.seed
    }

    /// Fresh per-request personalization set: seed plus live library.
    #[must_use]
    pub fn personalization_for(&self, live: Option<&dyn LibrarySource>) -> PersonalizationSet {
        PersonalizationSet::assemble(&self.seed, live)
    }

    /// Run the selector for one request.
    pub fn recommend<R: Rng + ?Sized>(
        &self,
        mood: &str,
        live: Option<&dyn LibrarySource>,
        rng: &mut R,
    ) -> RecommendationResult {
        let personal = self.personalization_for(live);
        select(&self.database, mood, &personal, &self.selector, rng)
    }
}
