//! Feature standardization and label encoding.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Zero-mean, unit-variance scaling fitted once on training rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit column means and population standard deviations. Constant
    /// columns get a scale of 1 so they map to zero instead of NaN.
    #[must_use]
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        #[allow(clippy::cast_precision_loss)]
        let n = rows.len().max(1) as f64;

        let mut means = vec![0.0; width];
        for row in rows {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value;
            }
        }
        means.iter_mut().for_each(|m| *m /= n);

        let mut scales = vec![0.0; width];
        for row in rows {
            for ((var, value), mean) in scales.iter_mut().zip(row).zip(&means) {
                *var += (value - mean).powi(2);
            }
        }
        for scale in &mut scales {
            let std = (*scale / n).sqrt();
            *scale = if std > f64::EPSILON { std } else { 1.0 };
        }

        Self { means, scales }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.means.len()
    }

    #[must_use]
    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(value, (mean, scale))| (value - mean) / scale)
            .collect()
    }

    #[must_use]
    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }
}

/// Dense integer codes for a label vocabulary, sorted alphabetically so
/// the same labels always get the same codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    #[must_use]
    pub fn fit<S: AsRef<str>>(labels: &[S]) -> Self {
        let classes: BTreeSet<&str> = labels.iter().map(|label| label.as_ref()).collect();
        Self {
            classes: classes.into_iter().map(str::to_string).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    #[must_use]
    pub fn encode(&self, label: &str) -> Option<usize> {
        self.classes.binary_search_by(|c| c.as_str().cmp(label)).ok()
    }

    #[must_use]
    pub fn decode(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaler_centers_and_scales() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 10.0], vec![5.0, 10.0]];
        let scaler = StandardScaler::fit(&rows);

        assert_eq!(scaler.means, vec![3.0, 10.0]);
        assert!((scaler.scales[0] - (8.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(scaler.scales[1], 1.0, "constant column keeps unit scale");

        let scaled = scaler.transform(&rows);
        let mean: f64 = scaled.iter().map(|r| r[0]).sum::<f64>() / 3.0;
        assert!(mean.abs() < 1e-12);
        assert!(scaled.iter().all(|r| r[1] == 0.0));
    }

    #[test]
    fn test_encoder_is_alphabetical_and_stable() {
        let a = LabelEncoder::fit(&["Sad/Melancholy", "Angry/Tense", "Happy/Energetic", "Angry/Tense"]);
        let b = LabelEncoder::fit(&["Happy/Energetic", "Sad/Melancholy", "Angry/Tense"]);

        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert_eq!(a.encode("Angry/Tense"), Some(0));
        assert_eq!(a.encode("Sad/Melancholy"), Some(2));
        assert_eq!(a.encode("Calm/Peaceful"), None);
        assert_eq!(a.decode(1), Some("Happy/Energetic"));
        assert_eq!(a.decode(3), None);
    }
}
