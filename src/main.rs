//! # Valora
//!
//! Offline pipeline and recommendation front end for the mood-labeled
//! track database.
//!
//! ## Usage
//!
//! ```bash
//! # Merge sources, train the genre model, build the database
//! valora merge
//! valora train --model genre
//! valora build
//!
//! # Ask for recommendations
//! valora recommend --mood "Sad/Melancholy"
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use valora::cli::{self, Command};
use valora::config::PipelineConfig;
use valora::context::ServeContext;
use valora::database::TrackDatabase;
use valora::dataset::{genre_counts, mood_counts, read_processed, write_processed};
use valora::ml::{ModelBundle, ModelKind};
use valora::{builder, merge, train};

fn run_merge(config: &PipelineConfig) -> Result<()> {
    let (tracks, report) = merge::merge_sources(&config.sources)?;
    for (mood, count) in mood_counts(&tracks) {
        info!("  {mood}: {count}");
    }
    for (genre, count) in genre_counts(&tracks) {
        info!("  {genre}: {count}");
    }
    write_processed(&config.processed_path, &tracks)?;
    println!(
        "Merged {} tracks ({} duplicates, {} incomplete rows dropped) into {}",
        report.merged,
        report.duplicates_removed,
        report.incomplete_dropped,
        config.processed_path.display()
    );
    Ok(())
}

fn run_train(config: &PipelineConfig, kind: ModelKind, choice: cli::AlgorithmChoice) -> Result<()> {
    let tracks = read_processed(&config.processed_path)?;
    let outcomes = train::train_models(&tracks, kind, &choice.algorithms(), &config.train, &config.models_dir)?;
    for outcome in outcomes {
        println!(
            "{} {}: accuracy {:.4}, bundle {}, report {}",
            kind,
            outcome.bundle.algorithm(),
            outcome.evaluation.accuracy,
            outcome.bundle_path.display(),
            outcome.report_path.display()
        );
    }
    Ok(())
}

fn run_build(config: &PipelineConfig) -> Result<()> {
    let tracks = read_processed(&config.processed_path)?;
    let bundle_path = config.genre_bundle_path();
    let bundle = if bundle_path.exists() {
        Some(ModelBundle::load(&bundle_path)?)
    } else {
        info!("No genre bundle at {}", bundle_path.display());
        None
    };

    let (db, report) = builder::build_database(&tracks, bundle.as_ref())?;
    db.save(&config.database_path)?;
    println!("Built {}: {report}", config.database_path.display());
    Ok(())
}

fn run_recommend(
    mut config: PipelineConfig,
    mood: &str,
    count: Option<usize>,
    seed_file: Option<std::path::PathBuf>,
    rng_seed: Option<u64>,
) -> Result<()> {
    if let Some(count) = count {
        config.selector.target_count = count;
    }
    if seed_file.is_some() {
        config.seed_path = seed_file;
    }

    let context = ServeContext::load(&config)?;
    let mut rng = match rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let result = context.recommend(mood, None, &mut rng);
    let json = serde_json::to_string_pretty(&result).context("Failed to render recommendations")?;
    println!("{json}");
    Ok(())
}

fn run_stats(config: &PipelineConfig) -> Result<()> {
    let db = TrackDatabase::load(&config.database_path)?;
    println!("{} tracks in {}", db.len(), config.database_path.display());
    println!("\nMoods:");
    for (mood, count) in db.mood_distribution() {
        println!("  {mood:<20} {count}");
    }
    println!("\nSuper-genres:");
    for (genre, count) in db.genre_distribution() {
        println!("  {genre:<20} {count}");
    }
    Ok(())
}

/// Main entry point.
///
/// Logging is controlled via `RUST_LOG`:
/// - `RUST_LOG=info valora build` - Stage summaries and drop counts
/// - `RUST_LOG=valora::train=debug valora train --model mood` - Module-specific logging
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();
    let config = PipelineConfig::load_or_default(args.config.as_deref())?;

    match args.command {
        Command::Merge => run_merge(&config)?,
        Command::Train { model, algorithm } => run_train(&config, model, algorithm)?,
        Command::Build => run_build(&config)?,
        Command::Recommend { mood, count, seed_file, rng_seed } => {
            run_recommend(config, &mood, count, seed_file, rng_seed)?;
        }
        Command::Stats => run_stats(&config)?,
    }

    Ok(())
}
