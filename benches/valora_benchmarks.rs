//! # Valora Performance Benchmarks
//!
//! Benchmarks for the request path and the offline hot loops.
//!
//! ## Benchmark Categories
//!
//! - **Selection**: Recommendation sampling against databases of several sizes
//! - **Labeling**: Mood rule and genre keyword heuristic
//! - **Models**: Forest fitting and per-track bundle prediction
//!
//! ## Running Benchmarks
//!
//! ```bash
//! cargo bench
//! cargo bench selection
//! ```

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;
use valora::database::{CanonicalTrack, TrackDatabase};
use valora::features::{FeatureSet, FeatureVector};
use valora::genre::{super_genre_from_raw, SuperGenre};
use valora::ml::{Classifier, ForestParams, LabelEncoder, ModelBundle, ModelKind, RandomForest, StandardScaler};
use valora::mood::{quadrant_mood, Mood};
use valora::personalization::PersonalizationSet;
use valora::recommend::{select, SelectorConfig};

fn create_database(count: usize) -> TrackDatabase {
    TrackDatabase::from_tracks(
        (0..count)
            .map(|i| CanonicalTrack {
                track_id: format!("track{i}"),
                track_name: format!("Song {i}"),
                artists: format!("Artist {}", i % 97),
                mood: Mood::ALL[i % 4],
                super_genre: SuperGenre::ALL[i % 8],
            })
            .collect(),
    )
}

fn random_features(rng: &mut StdRng) -> FeatureVector {
    FeatureVector {
        danceability: rng.gen(),
        energy: rng.gen(),
        key: f64::from(rng.gen_range(0..12u8)),
        loudness: rng.gen_range(-40.0..0.0),
        speechiness: rng.gen(),
        acousticness: rng.gen(),
        instrumentalness: rng.gen(),
        liveness: rng.gen(),
        valence: rng.gen(),
        tempo: rng.gen_range(60.0..180.0),
        time_signature: 4.0,
    }
}

fn benchmark_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection");
    let config = SelectorConfig::default();

    for size in [1_000, 10_000, 100_000] {
        let db = create_database(size);
        let personal: PersonalizationSet = (0..200).map(|i| format!("track{}", i * 7)).collect();

        group.bench_with_input(BenchmarkId::new("select_20", size), &db, |b, db| {
            let mut rng = StdRng::seed_from_u64(1);
            b.iter(|| select(black_box(db), "Happy/Energetic", &personal, &config, &mut rng));
        });
    }

    group.finish();
}

fn benchmark_labeling(c: &mut Criterion) {
    let mut group = c.benchmark_group("labeling");

    group.bench_function("quadrant_mood", |b| {
        b.iter(|| quadrant_mood(black_box(0.42), black_box(0.73)));
    });

    let genres = ["indie-rock", "deep-house", "k-pop", "bossa-nova", "black-metal", ""];
    group.bench_function("super_genre_from_raw", |b| {
        b.iter(|| {
            for genre in &genres {
                black_box(super_genre_from_raw(Some(black_box(*genre))));
            }
        });
    });

    group.finish();
}

fn benchmark_models(c: &mut Criterion) {
    let mut group = c.benchmark_group("models");
    group.sample_size(10);

    let mut rng = StdRng::seed_from_u64(7);
    let features: Vec<FeatureVector> = (0..2_000).map(|_| random_features(&mut rng)).collect();
    let rows: Vec<Vec<f64>> = features.iter().map(|f| FeatureSet::Full.project(f)).collect();
    let labels: Vec<&str> = features
        .iter()
        .map(|f| if f.acousticness > 0.5 { "Classical/Acoustic" } else { "Electronic/Dance" })
        .collect();

    let scaler = StandardScaler::fit(&rows);
    let scaled = scaler.transform(&rows);
    let encoder = LabelEncoder::fit(&labels);
    let y: Vec<usize> = labels.iter().filter_map(|l| encoder.encode(l)).collect();
    let params = ForestParams { n_trees: 20, ..ForestParams::genre() };

    group.bench_function("forest_fit_2000", |b| {
        b.iter_batched(
            || scaled.clone(),
            |x| RandomForest::fit(&x, &y, encoder.len(), &params),
            BatchSize::LargeInput,
        );
    });

    let forest = RandomForest::fit(&scaled, &y, encoder.len(), &params);
    let bundle = ModelBundle::new(ModelKind::Genre, scaler, encoder.clone(), Classifier::Forest(forest))
        .expect("Failed to assemble benchmark bundle");
    group.bench_function("bundle_predict_label", |b| {
        b.iter(|| bundle.predict_label(black_box(&features[17])).map(str::len));
    });
    group.bench_function("bundle_predict_2000", |b| {
        b.iter(|| bundle.predict_labels(black_box(&features)).len());
    });

    group.finish();
}

criterion_group!(benches, benchmark_selection, benchmark_labeling, benchmark_models);

criterion_main!(benches);
