//! # Random Forest Classifier
//!
//! Bagged CART trees split on weighted Gini impurity. Each tree sees a
//! bootstrap sample of the rows and `sqrt(n_features)` candidate features
//! per split. Trees are independent, so they are fitted in parallel; each
//! one owns an RNG seeded from the forest seed and its index, which keeps
//! the result identical no matter how rayon schedules the work.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Size and accuracy knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Weight classes inversely to their frequency.
    pub balanced: bool,
    pub seed: u64,
}

impl ForestParams {
    /// Deep trees with thin leaves; the mood target has few classes.
    #[must_use]
    pub fn mood() -> Self {
        Self { n_trees: 150, max_depth: 25, min_samples_leaf: 2, balanced: true, seed: 42 }
    }

    /// Shallower trees with thick leaves to keep the bundle small.
    #[must_use]
    pub fn genre() -> Self {
        Self { n_trees: 100, max_depth: 15, min_samples_leaf: 5, balanced: true, seed: 42 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf { distribution: Vec<f64> },
    Split { feature: usize, threshold: f64, left: usize, right: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn leaf_for(&self, row: &[f64]) -> &[f64] {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                Node::Leaf { distribution } => return distribution,
                Node::Split { feature, threshold, left, right } => {
                    at = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    n_classes: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fit on scaled rows `x` with class codes `y` in `0..n_classes`.
    ///
    /// An empty `x` yields a forest with no trees, which predicts class 0.
    #[must_use]
    pub fn fit(x: &[Vec<f64>], y: &[usize], n_classes: usize, params: &ForestParams) -> Self {
        let n_features = x.first().map_or(0, Vec::len);
        if x.is_empty() {
            return Self { n_features, n_classes, trees: Vec::new() };
        }
        let class_weights = class_weights(y, n_classes, params.balanced);
        let weights: Vec<f64> = y.iter().map(|&c| class_weights[c]).collect();

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let n_candidates = ((n_features as f64).sqrt().floor() as usize).max(1);

        let builder = TreeBuilder {
            x,
            y,
            weights: &weights,
            n_classes,
            n_candidates,
            max_depth: params.max_depth,
            min_leaf: params.min_samples_leaf.max(1),
        };

        let trees = (0..params.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(t as u64));
                let sample: Vec<usize> = (0..x.len()).map(|_| rng.gen_range(0..x.len())).collect();
                builder.build(sample, &mut rng)
            })
            .collect();

        Self { n_features, n_classes, trees }
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Mean of the leaf class distributions across trees.
    #[must_use]
    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let mut probs = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (p, q) in probs.iter_mut().zip(tree.leaf_for(row)) {
                *p += q;
            }
        }
        if !self.trees.is_empty() {
            #[allow(clippy::cast_precision_loss)]
            let n = self.trees.len() as f64;
            probs.iter_mut().for_each(|p| *p /= n);
        }
        probs
    }

    #[must_use]
    pub fn predict(&self, row: &[f64]) -> usize {
        argmax(&self.predict_proba(row))
    }
}

/// Index of the largest value; ties go to the lowest index.
pub(crate) fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
        .0
}

fn class_weights(y: &[usize], n_classes: usize, balanced: bool) -> Vec<f64> {
    if !balanced {
        return vec![1.0; n_classes];
    }
    let mut counts = vec![0usize; n_classes];
    for &c in y {
        counts[c] += 1;
    }
    #[allow(clippy::cast_precision_loss)]
    let (n, k) = (y.len() as f64, n_classes as f64);
    counts
        .iter()
        .map(|&count| if count == 0 { 0.0 } else { n / (k * count as f64) })
        .collect()
}

fn gini(totals: &[f64], weight: f64) -> f64 {
    if weight <= 0.0 {
        return 0.0;
    }
    1.0 - totals.iter().map(|t| (t / weight).powi(2)).sum::<f64>()
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    weights: &'a [f64],
    n_classes: usize,
    n_candidates: usize,
    max_depth: usize,
    min_leaf: usize,
}

struct SplitChoice {
    feature: usize,
    threshold: f64,
}

impl TreeBuilder<'_> {
    fn build(&self, sample: Vec<usize>, rng: &mut StdRng) -> DecisionTree {
        let mut nodes = Vec::new();
        self.grow(&mut nodes, sample, 0, rng);
        DecisionTree { nodes }
    }

    fn totals(&self, rows: &[usize]) -> Vec<f64> {
        let mut totals = vec![0.0; self.n_classes];
        for &i in rows {
            totals[self.y[i]] += self.weights[i];
        }
        totals
    }

    fn grow(&self, nodes: &mut Vec<Node>, rows: Vec<usize>, depth: usize, rng: &mut StdRng) -> usize {
        let totals = self.totals(&rows);
        let weight: f64 = totals.iter().sum();
        let id = nodes.len();
        nodes.push(leaf(&totals, weight));

        let pure = totals.iter().filter(|&&t| t > 0.0).count() <= 1;
        if pure || depth >= self.max_depth || rows.len() < 2 * self.min_leaf {
            return id;
        }

        let Some(choice) = self.best_split(&rows, &totals, weight, rng) else {
            return id;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&i| self.x[i][choice.feature] <= choice.threshold);
        let left = self.grow(nodes, left_rows, depth + 1, rng);
        let right = self.grow(nodes, right_rows, depth + 1, rng);
        nodes[id] = Node::Split { feature: choice.feature, threshold: choice.threshold, left, right };
        id
    }

    fn best_split(&self, rows: &[usize], totals: &[f64], weight: f64, rng: &mut StdRng) -> Option<SplitChoice> {
        let n_features = self.x.first().map_or(0, Vec::len);
        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(rng);

        let parent = gini(totals, weight);
        let mut best: Option<(f64, SplitChoice)> = None;
        let mut tried = 0;

        // Constant features do not count against the candidate budget, and
        // the search keeps going past the budget until some split is found.
        for &feature in &features {
            if tried >= self.n_candidates && best.is_some() {
                break;
            }
            let mut ordered: Vec<(f64, usize)> = rows.iter().map(|&i| (self.x[i][feature], i)).collect();
            ordered.sort_by(|a, b| a.0.total_cmp(&b.0));
            if ordered.first().map(|f| f.0) == ordered.last().map(|l| l.0) {
                continue;
            }
            tried += 1;

            let mut left = vec![0.0; self.n_classes];
            let mut left_weight = 0.0;
            for p in 0..ordered.len() - 1 {
                let (value, i) = ordered[p];
                left[self.y[i]] += self.weights[i];
                left_weight += self.weights[i];

                let next = ordered[p + 1].0;
                let left_count = p + 1;
                let right_count = ordered.len() - left_count;
                if value == next || left_count < self.min_leaf || right_count < self.min_leaf {
                    continue;
                }

                let right: Vec<f64> = totals.iter().zip(&left).map(|(t, l)| t - l).collect();
                let right_weight = weight - left_weight;
                let impurity = (left_weight * gini(&left, left_weight)
                    + right_weight * gini(&right, right_weight))
                    / weight;

                if impurity + 1e-12 < parent && best.as_ref().map_or(true, |(b, _)| impurity < *b) {
                    let mid = value + (next - value) / 2.0;
                    let threshold = if mid < next { mid } else { value };
                    best = Some((impurity, SplitChoice { feature, threshold }));
                }
            }
        }

        best.map(|(_, choice)| choice)
    }
}

fn leaf(totals: &[f64], weight: f64) -> Node {
    let distribution = if weight > 0.0 {
        totals.iter().map(|t| t / weight).collect()
    } else {
        vec![0.0; totals.len()]
    };
    Node::Leaf { distribution }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs(n: usize) -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut rng = StdRng::seed_from_u64(3);
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..n {
            let class = i % 2;
            let center = if class == 0 { -2.0 } else { 2.0 };
            x.push(vec![center + rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)]);
            y.push(class);
        }
        (x, y)
    }

    fn small_params() -> ForestParams {
        ForestParams { n_trees: 10, max_depth: 6, min_samples_leaf: 1, balanced: true, seed: 9 }
    }

    #[test]
    fn test_fit_on_empty_rows_yields_no_trees() {
        let forest = RandomForest::fit(&[], &[], 3, &small_params());
        assert!(forest.trees().is_empty());
        assert_eq!(forest.predict_proba(&[0.0, 0.0]), vec![0.0; 3]);
        assert_eq!(forest.predict(&[0.0, 0.0]), 0);
    }

    #[test]
    fn test_separable_blobs_are_learned() {
        let (x, y) = two_blobs(200);
        let forest = RandomForest::fit(&x, &y, 2, &small_params());

        assert_eq!(forest.n_features(), 2);
        assert_eq!(forest.n_classes(), 2);
        assert_eq!(forest.predict(&[-2.5, 0.0]), 0);
        assert_eq!(forest.predict(&[2.5, 0.0]), 1);

        let probs = forest.predict_proba(&[2.5, 0.0]);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = two_blobs(80);
        let a = RandomForest::fit(&x, &y, 2, &small_params());
        let b = RandomForest::fit(&x, &y, 2, &small_params());
        assert_eq!(a, b);
    }

    #[test]
    fn test_depth_limit_makes_stumps() {
        let (x, y) = two_blobs(60);
        let params = ForestParams { max_depth: 1, ..small_params() };
        let forest = RandomForest::fit(&x, &y, 2, &params);
        assert!(forest.trees().iter().all(|t| t.node_count() <= 3));
    }

    #[test]
    fn test_min_leaf_larger_than_sample_gives_single_leaf() {
        let (x, y) = two_blobs(20);
        let params = ForestParams { min_samples_leaf: 50, ..small_params() };
        let forest = RandomForest::fit(&x, &y, 2, &params);
        assert!(forest.trees().iter().all(|t| t.node_count() == 1));
    }

    #[test]
    fn test_balanced_weights_favor_rare_class() {
        let weights = class_weights(&[0, 0, 0, 1], 2, true);
        assert!((weights[0] - 4.0 / 6.0).abs() < 1e-12);
        assert!((weights[1] - 2.0).abs() < 1e-12);
        assert_eq!(class_weights(&[0, 1], 3, true)[2], 0.0);
        assert_eq!(class_weights(&[0, 1], 2, false), vec![1.0, 1.0]);
    }

    #[test]
    fn test_argmax_prefers_first_on_tie() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), 1);
        assert_eq!(argmax(&[]), 0);
    }
}
