//! # Linear Margin Classifier
//!
//! One-vs-rest linear SVM trained with Pegasos sub-gradient steps on the
//! hinge loss. It is the comparison baseline for the forest, so it trades
//! accuracy for speed: training runs on a bounded random subsample.

use crate::ml::forest::argmax;
use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvmParams {
    /// Upper bound on training rows.
    pub subset_size: usize,
    /// Regularization strength.
    pub lambda: f64,
    pub epochs: usize,
    pub seed: u64,
}

impl Default for SvmParams {
    fn default() -> Self {
        Self { subset_size: 20_000, lambda: 1e-3, epochs: 5, seed: 42 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearSvm {
    n_features: usize,
    /// One weight vector per class; the last entry is the bias.
    weights: Vec<Vec<f64>>,
}

impl LinearSvm {
    #[must_use]
    pub fn fit(x: &[Vec<f64>], y: &[usize], n_classes: usize, params: &SvmParams) -> Self {
        let n_features = x.first().map_or(0, Vec::len);

        let mut rng = StdRng::seed_from_u64(params.seed);
        let rows: Vec<usize> = if x.len() > params.subset_size {
            log::info!("Training margin classifier on a subset of {} of {} rows", params.subset_size, x.len());
            index::sample(&mut rng, x.len(), params.subset_size).into_vec()
        } else {
            (0..x.len()).collect()
        };

        let weights = (0..n_classes)
            .into_par_iter()
            .map(|class| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(1 + class as u64));
                fit_binary(x, y, &rows, class, params, &mut rng)
            })
            .collect();

        Self { n_features, weights }
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.weights.len()
    }

    /// Signed distance to each class's hyperplane.
    #[must_use]
    pub fn decision(&self, row: &[f64]) -> Vec<f64> {
        self.weights.iter().map(|w| margin(w, row)).collect()
    }

    #[must_use]
    pub fn predict(&self, row: &[f64]) -> usize {
        argmax(&self.decision(row))
    }
}

fn margin(w: &[f64], row: &[f64]) -> f64 {
    let (bias, coef) = w.split_last().map_or((0.0, w), |(b, c)| (*b, c));
    coef.iter().zip(row).map(|(a, b)| a * b).sum::<f64>() + bias
}

fn fit_binary(
    x: &[Vec<f64>],
    y: &[usize],
    rows: &[usize],
    class: usize,
    params: &SvmParams,
    rng: &mut StdRng,
) -> Vec<f64> {
    let n_features = x.first().map_or(0, Vec::len);
    let mut w = vec![0.0; n_features + 1];
    let mut order = rows.to_vec();
    let lambda = params.lambda.max(f64::EPSILON);
    let radius = 1.0 / lambda.sqrt();
    let mut step = 1.0;

    for _ in 0..params.epochs {
        order.shuffle(rng);
        for &i in &order {
            let target = if y[i] == class { 1.0 } else { -1.0 };
            let eta = 1.0 / (lambda * step);
            let violated = target * margin(&w, &x[i]) < 1.0;

            w.iter_mut().for_each(|v| *v *= 1.0 - eta * lambda);
            if violated {
                for (v, value) in w.iter_mut().zip(x[i].iter().chain(std::iter::once(&1.0))) {
                    *v += eta * target * value;
                }
            }

            let norm = w.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > radius {
                w.iter_mut().for_each(|v| *v *= radius / norm);
            }
            step += 1.0;
        }
    }
    w
}
