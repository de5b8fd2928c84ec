//! Statistical fingerprinting and classification.
//!
//! Reduces each capture sample to a fixed six-dimensional feature vector,
//! standardizes vectors across the batch, and classifies them with one of
//! three interchangeable strategies (known-app lookup lives in
//! [`crate::classify`]; the distance-based models live here).
//!
//! # Example
//! ```ignore
//! use flowprint::ml::{FeatureExtractor, Normalizer};
//!
//! let extractor = FeatureExtractor::new();
//! let raw = extractor.extract_batch(&batch)?;
//! let normalizer = Normalizer::fit(&raw)?;
//! let normalized = normalizer.transform_batch(&raw);
//! ```

pub mod features;
pub mod gmm;
pub mod kmeans;
pub mod knn;
pub mod normalize;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

pub use features::{FeatureExtractor, FeatureVector, FEATURE_NAMES, MIN_PACKETS, NUM_FEATURES};
pub use gmm::GaussianMixture;
pub use kmeans::KMeans;
pub use knn::KnnClassifier;
pub use normalize::{FeatureStats, Normalizer};

/// Clustering configuration shared by k-means and the Gaussian mixture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Number of clusters to partition the batch into.
    pub clusters: usize,
    /// Random restarts for k-means (lowest inertia wins).
    pub restarts: usize,
    /// Iteration cap for Lloyd / EM loops.
    pub max_iterations: usize,
    /// Convergence tolerance (centroid shift / log-likelihood delta).
    pub tolerance: f64,
    /// Random seed for reproducibility; `None` seeds from the OS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            clusters: 4,
            restarts: 10,
            max_iterations: 200,
            tolerance: 1e-6,
            seed: None,
        }
    }
}

pub(crate) fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Squared Euclidean distance between equal-length vectors.
pub(crate) fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}
