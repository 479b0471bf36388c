// src/core/features/statistics.rs
//
// Per-dimension normalization fitted once over the training corpus.

use log::warn;
use serde::{Deserialize, Serialize};

use super::FeatureVector;
use crate::core::dsp::{mean, population_std};
use crate::error::{KwsError, Result};

/// Added to every std before division
pub const NORM_EPSILON: f32 = 1e-6;

/// Mean and population std of each feature dimension over a training corpus.
///
/// Produced by exactly one [`FeatureStatistics::fit`] call and reused verbatim
/// wherever features are normalized.
///
/// Refitting on the clip being classified is forbidden: statistics of a
/// single vector have `mean == vector` and `std == 0`, so the normalized
/// vector is all zeros no matter what was said. Nothing checks for this at
/// runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStatistics {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl FeatureStatistics {
    /// Element-wise mean and population std over the whole corpus
    pub fn fit(corpus: &[FeatureVector]) -> Result<Self> {
        let dim = corpus
            .first()
            .map(|v| v.len())
            .ok_or_else(|| KwsError::Training("cannot fit statistics on an empty corpus".into()))?;
        if let Some(bad) = corpus.iter().find(|v| v.len() != dim) {
            return Err(KwsError::Training(format!(
                "feature vectors disagree on dimensionality ({} vs {dim})",
                bad.len()
            )));
        }

        let mut means = Vec::with_capacity(dim);
        let mut stds = Vec::with_capacity(dim);
        for d in 0..dim {
            let column: Vec<f64> = corpus.iter().map(|v| v[d] as f64).collect();
            means.push(mean(&column) as f32);
            stds.push(population_std(&column) as f32);
        }

        let stats = Self {
            mean: means,
            std: stds,
        };
        let degenerate = stats.degenerate_dims();
        if !degenerate.is_empty() {
            warn!(
                "feature dimensions {degenerate:?} have near-zero variance over {} examples; normalization relies on the epsilon floor",
                corpus.len()
            );
        }
        Ok(stats)
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// `(v - mean) / (std + epsilon)` element-wise
    pub fn apply(&self, vector: &FeatureVector) -> Result<FeatureVector> {
        if vector.len() != self.dim() {
            return Err(KwsError::invalid_input(format!(
                "feature vector has {} dims, statistics expect {}",
                vector.len(),
                self.dim()
            )));
        }

        let normalized = vector
            .iter()
            .zip(self.mean.iter().zip(self.std.iter()))
            .map(|(&v, (&m, &s))| (v - m) / (s + NORM_EPSILON))
            .collect();
        Ok(FeatureVector::new(normalized))
    }

    pub fn apply_all(&self, vectors: &[FeatureVector]) -> Result<Vec<FeatureVector>> {
        vectors.iter().map(|v| self.apply(v)).collect()
    }

    /// Dimensions whose std is below the epsilon floor
    pub fn degenerate_dims(&self) -> Vec<usize> {
        self.std
            .iter()
            .enumerate()
            .filter(|(_, &s)| s < NORM_EPSILON)
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<FeatureVector> {
        vec![
            FeatureVector::new(vec![1.0, 10.0, 5.0]),
            FeatureVector::new(vec![2.0, 20.0, 5.0]),
            FeatureVector::new(vec![3.0, 30.0, 5.0]),
            FeatureVector::new(vec![6.0, 40.0, 5.0]),
        ]
    }

    #[test]
    fn test_fit_population_std() {
        let stats = FeatureStatistics::fit(&corpus()).unwrap();
        assert_eq!(stats.mean, vec![3.0, 25.0, 5.0]);
        // population variance of [1,2,3,6] is 3.5
        assert!((stats.std[0] - 3.5f32.sqrt()).abs() < 1e-6);
        assert_eq!(stats.std[2], 0.0);
        assert_eq!(stats.degenerate_dims(), vec![2]);
    }

    #[test]
    fn test_normalized_corpus_is_standardized() {
        let data = corpus();
        let stats = FeatureStatistics::fit(&data).unwrap();
        let normalized = stats.apply_all(&data).unwrap();

        for d in 0..2 {
            let column: Vec<f64> = normalized.iter().map(|v| v[d] as f64).collect();
            assert!(mean(&column).abs() < 1e-5);
            assert!((population_std(&column) - 1.0).abs() < 1e-4);
        }
        // Constant dimension collapses to zero instead of dividing by zero
        assert!(normalized.iter().all(|v| v[2] == 0.0));
    }

    #[test]
    fn test_refit_on_single_sample_degenerates() {
        // Documented misuse: statistics from the very vector being normalized
        let v = FeatureVector::new(vec![4.0, -3.0, 12.5]);
        let stats = FeatureStatistics::fit(std::slice::from_ref(&v)).unwrap();
        let normalized = stats.apply(&v).unwrap();
        assert!(normalized.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_errors() {
        assert!(FeatureStatistics::fit(&[]).is_err());

        let ragged = vec![FeatureVector::new(vec![1.0]), FeatureVector::new(vec![1.0, 2.0])];
        assert!(FeatureStatistics::fit(&ragged).is_err());

        let stats = FeatureStatistics::fit(&corpus()).unwrap();
        assert!(stats.apply(&FeatureVector::new(vec![1.0])).is_err());
    }
}
