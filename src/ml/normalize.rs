//! Batch standardization of feature vectors.
//!
//! Fitted once over the full batch, applied read-only afterwards. Refitting
//! with a different batch invalidates every previously classified result, so
//! the normalizer is consumed by value nowhere and mutated nowhere after
//! [`Normalizer::fit`] returns.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::features::{FeatureVector, FEATURE_NAMES, NUM_FEATURES};
use crate::error::{FlowprintError, Result};

/// Standard deviations below this are treated as zero variance.
const MIN_STD: f64 = 1e-12;

/// Streaming statistics for a single feature dimension, Welford's online
/// algorithm for the mean and M2.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeatureStats {
    pub count: u64,
    pub mean: f64,
    pub m2: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for FeatureStats {
    fn default() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::MAX,
            max: f64::MIN,
        }
    }
}

impl FeatureStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn update(&mut self, value: f64) {
        self.count += 1;

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    /// Population variance (divisor n). Standardizing with this divisor and
    /// measuring with the same divisor gives unit variance exactly.
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    pub fn std(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn range(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.max - self.min
        }
    }
}

/// Per-dimension z-score normalizer fitted over one batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Normalizer {
    means: [f64; NUM_FEATURES],
    stds: [f64; NUM_FEATURES],
    samples: u64,
}

impl Normalizer {
    /// Fit over the whole batch. A dimension with zero variance across the
    /// batch cannot be standardized and fails the run, naming the feature.
    pub fn fit(vectors: &[FeatureVector]) -> Result<Self> {
        if vectors.is_empty() {
            return Err(FlowprintError::EmptyBatch);
        }

        let mut stats = [FeatureStats::new(); NUM_FEATURES];
        for vector in vectors {
            for (dim, &value) in vector.as_slice().iter().enumerate() {
                stats[dim].update(value);
            }
        }

        let mut means = [0.0; NUM_FEATURES];
        let mut stds = [0.0; NUM_FEATURES];
        for (dim, stat) in stats.iter().enumerate() {
            let std = stat.std();
            if std < MIN_STD {
                return Err(FlowprintError::DegenerateFeature {
                    dimension: FEATURE_NAMES[dim],
                });
            }
            means[dim] = stat.mean;
            stds[dim] = std;
        }

        debug!(samples = vectors.len(), "fitted normalizer");
        Ok(Self {
            means,
            stds,
            samples: vectors.len() as u64,
        })
    }

    /// Standardize one vector: `(x - mean) / std` per dimension.
    pub fn transform(&self, vector: &FeatureVector) -> FeatureVector {
        let mut features = [0.0; NUM_FEATURES];
        for (dim, &value) in vector.as_slice().iter().enumerate() {
            features[dim] = (value - self.means[dim]) / self.stds[dim];
        }
        FeatureVector::new(vector.sample(), features)
    }

    pub fn transform_batch(&self, vectors: &[FeatureVector]) -> Vec<FeatureVector> {
        vectors.iter().map(|v| self.transform(v)).collect()
    }

    pub fn mean(&self, dim: usize) -> f64 {
        self.means[dim]
    }

    pub fn std(&self, dim: usize) -> f64 {
        self.stds[dim]
    }

    /// Number of vectors the parameters were fitted on.
    pub fn samples(&self) -> u64 {
        self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(name: &str, values: [f64; NUM_FEATURES]) -> FeatureVector {
        FeatureVector::new(name, values)
    }

    fn spread_batch() -> Vec<FeatureVector> {
        vec![
            vector("a", [100.0, 10.0, 0.1, 0.01, 50.0, 1.0]),
            vector("b", [200.0, 20.0, 0.2, 0.02, 150.0, 2.0]),
            vector("c", [300.0, 30.0, 0.3, 0.03, 250.0, 3.0]),
            vector("d", [400.0, 40.0, 0.4, 0.04, 350.0, 4.0]),
        ]
    }

    #[test]
    fn test_feature_stats_welford() {
        let mut stats = FeatureStats::new();
        for v in [1.0, 2.0, 3.0, 4.0] {
            stats.update(v);
        }

        assert_eq!(stats.count, 4);
        assert!((stats.mean - 2.5).abs() < 1e-12);
        // Population variance of 1..4 is 1.25
        assert!((stats.variance() - 1.25).abs() < 1e-12);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert!((stats.range() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_roundtrip_zero_mean_unit_variance() {
        let batch = spread_batch();
        let normalizer = Normalizer::fit(&batch).unwrap();
        let transformed = normalizer.transform_batch(&batch);

        for dim in 0..NUM_FEATURES {
            let mut check = FeatureStats::new();
            for v in &transformed {
                check.update(v.as_slice()[dim]);
            }
            assert!(check.mean.abs() < 1e-6, "dim {} mean {}", dim, check.mean);
            assert!(
                (check.std() - 1.0).abs() < 1e-6,
                "dim {} std {}",
                dim,
                check.std()
            );
        }
    }

    #[test]
    fn test_degenerate_dimension_is_named() {
        // std_interval identical across the batch
        let batch = vec![
            vector("a", [100.0, 10.0, 0.1, 0.5, 50.0, 1.0]),
            vector("b", [200.0, 20.0, 0.2, 0.5, 150.0, 2.0]),
            vector("c", [300.0, 30.0, 0.3, 0.5, 250.0, 3.0]),
        ];

        let err = Normalizer::fit(&batch).unwrap_err();
        assert!(matches!(
            err,
            FlowprintError::DegenerateFeature {
                dimension: "std_interval"
            }
        ));
    }

    #[test]
    fn test_empty_batch_is_error() {
        assert!(matches!(
            Normalizer::fit(&[]),
            Err(FlowprintError::EmptyBatch)
        ));
    }

    #[test]
    fn test_transform_preserves_sample_name() {
        let batch = spread_batch();
        let normalizer = Normalizer::fit(&batch).unwrap();
        let transformed = normalizer.transform(&batch[2]);
        assert_eq!(transformed.sample(), "c");
    }
}
