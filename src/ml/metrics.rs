//! Evaluation metrics for trained classifiers.
//!
//! Reports are written for a human to read next to the bundle. Nothing in
//! the pipeline consumes them.

use serde::Serialize;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub accuracy: f64,
    pub per_class: Vec<ClassMetrics>,
    /// `confusion[true][predicted]`
    pub confusion: Vec<Vec<usize>>,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        let r = num as f64 / den as f64;
        r
    }
}

/// Compare predictions with the truth. `labels[i]` names class `i`.
#[must_use]
pub fn evaluate(truth: &[usize], predicted: &[usize], labels: &[String]) -> Evaluation {
    let n = labels.len();
    let mut confusion = vec![vec![0usize; n]; n];
    for (&t, &p) in truth.iter().zip(predicted) {
        if t < n && p < n {
            confusion[t][p] += 1;
        }
    }

    let correct: usize = (0..n).map(|i| confusion[i][i]).sum();
    let per_class = (0..n)
        .map(|class| {
            let tp = confusion[class][class];
            let support: usize = confusion[class].iter().sum();
            let predicted_as: usize = confusion.iter().map(|row| row[class]).sum();
            let precision = ratio(tp, predicted_as);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics { label: labels[class].clone(), precision, recall, f1, support }
        })
        .collect();

    Evaluation {
        accuracy: ratio(correct, truth.len()),
        per_class,
        confusion,
    }
}

impl Evaluation {
    /// Plain-text classification report plus confusion matrix.
    #[must_use]
    pub fn render(&self, title: &str) -> String {
        let width = self
            .per_class
            .iter()
            .map(|c| c.label.len())
            .max()
            .unwrap_or(5)
            .max(5);

        let mut out = String::new();
        let _ = writeln!(out, "{title}");
        let _ = writeln!(out, "accuracy: {:.4}\n", self.accuracy);
        let _ = writeln!(
            out,
            "{:>width$}  {:>9}  {:>9}  {:>9}  {:>9}",
            "", "precision", "recall", "f1-score", "support"
        );
        for c in &self.per_class {
            let _ = writeln!(
                out,
                "{:>width$}  {:>9.2}  {:>9.2}  {:>9.2}  {:>9}",
                c.label, c.precision, c.recall, c.f1, c.support
            );
        }

        let _ = writeln!(out, "\nconfusion matrix (rows = true, columns = predicted)");
        for (label, row) in self.per_class.iter().map(|c| &c.label).zip(&self.confusion) {
            let cells: Vec<String> = row.iter().map(|v| format!("{v:>7}")).collect();
            let _ = writeln!(out, "{label:>width$}  {}", cells.join(""));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_counts() {
        let labels = vec!["a".to_string(), "b".to_string()];
        let truth = [0, 0, 1, 1];
        let predicted = [0, 1, 1, 1];

        let eval = evaluate(&truth, &predicted, &labels);

        assert!((eval.accuracy - 0.75).abs() < 1e-12);
        assert_eq!(eval.confusion, vec![vec![1, 1], vec![0, 2]]);
        assert!((eval.per_class[0].precision - 1.0).abs() < 1e-12);
        assert!((eval.per_class[0].recall - 0.5).abs() < 1e-12);
        assert!((eval.per_class[1].precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(eval.per_class[1].support, 2);
    }

    #[test]
    fn test_empty_input_does_not_divide_by_zero() {
        let eval = evaluate(&[], &[], &["only".to_string()]);
        assert_eq!(eval.accuracy, 0.0);
        assert_eq!(eval.per_class[0].f1, 0.0);
        assert!(eval.render("empty").contains("accuracy: 0.0000"));
    }
}
