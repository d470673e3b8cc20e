//! Stratified train/test splitting.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices for each side of a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split row indices so every class keeps its share on both sides.
///
/// Each class is shuffled with the seeded RNG and `round(test_fraction * n)`
/// of its rows go to the test side. A class is never emptied from the
/// training side, so singleton classes stay in train.
#[must_use]
pub fn stratified_split(labels: &[usize], test_fraction: f64, seed: u64) -> Split {
    let n_classes = labels.iter().max().map_or(0, |m| m + 1);
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (row, &label) in labels.iter().enumerate() {
        by_class[label].push(row);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut split = Split { train: Vec::new(), test: Vec::new() };
    let fraction = test_fraction.clamp(0.0, 1.0);

    for mut rows in by_class {
        rows.shuffle(&mut rng);
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let wanted = (fraction * rows.len() as f64).round() as usize;
        let n_test = wanted.min(rows.len().saturating_sub(1));
        split.test.extend_from_slice(&rows[..n_test]);
        split.train.extend_from_slice(&rows[n_test..]);
    }

    split.train.sort_unstable();
    split.test.sort_unstable();
    split
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_is_stratified_and_disjoint() {
        let labels: Vec<usize> = (0..100).map(|i| usize::from(i % 10 == 0)).collect();
        let split = stratified_split(&labels, 0.2, 42);

        assert_eq!(split.train.len() + split.test.len(), 100);
        assert_eq!(split.test.len(), 20);
        let minority_in_test = split.test.iter().filter(|&&i| labels[i] == 1).count();
        assert_eq!(minority_in_test, 2);
        assert!(split.train.iter().all(|i| !split.test.contains(i)));
    }

    #[test]
    fn test_split_is_deterministic_per_seed() {
        let labels: Vec<usize> = (0..50).map(|i| i % 3).collect();
        assert_eq!(stratified_split(&labels, 0.2, 7), stratified_split(&labels, 0.2, 7));
    }

    #[test]
    fn test_singleton_class_stays_in_train() {
        let split = stratified_split(&[0, 0, 0, 0, 1], 0.5, 1);
        assert!(split.train.contains(&4));
        assert!(!split.test.contains(&4));
    }
}
