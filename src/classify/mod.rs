//! Category classification of normalized feature vectors.
//!
//! Three interchangeable strategies behind one explicit selection enum:
//! name-based lookup against the known-app table, supervised k-NN trained on
//! the known subset, and unsupervised clustering (k-means or Gaussian
//! mixture). Every strategy consumes the same normalized batch and produces
//! one [`Classification`] per sample, in batch order.

pub mod known_apps;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ClassifierConfig;
use crate::core::SampleBatch;
use crate::error::{FlowprintError, Result};
use crate::ml::{FeatureVector, GaussianMixture, KMeans, KnnClassifier};

pub use known_apps::{KnownApp, KnownAppTable, UNKNOWN_CATEGORY};

/// Which classification strategy a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Name-based lookup against the known-app table; features unused.
    Lookup,
    /// Supervised nearest-neighbor, trained on the known subset.
    Knn,
    /// Centroid clustering; cluster ids carry no semantic label.
    KMeans,
    /// Gaussian-mixture clustering; cluster ids carry no semantic label.
    Gmm,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Lookup => "lookup",
            Strategy::Knn => "knn",
            Strategy::KMeans => "kmeans",
            Strategy::Gmm => "gmm",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lookup" => Ok(Strategy::Lookup),
            "knn" => Ok(Strategy::Knn),
            "kmeans" | "k-means" => Ok(Strategy::KMeans),
            "gmm" | "gaussian" => Ok(Strategy::Gmm),
            other => Err(format!(
                "unknown strategy '{}' (expected lookup, knn, kmeans or gmm)",
                other
            )),
        }
    }
}

/// Per-sample classification outcome. A single run produces either a
/// category or a cluster id, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Category(String),
    Cluster(usize),
}

impl Classification {
    pub fn category(&self) -> Option<&str> {
        match self {
            Classification::Category(c) => Some(c),
            Classification::Cluster(_) => None,
        }
    }

    pub fn cluster(&self) -> Option<usize> {
        match self {
            Classification::Category(_) => None,
            Classification::Cluster(id) => Some(*id),
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Category(c) => write!(f, "{}", c),
            Classification::Cluster(id) => write!(f, "cluster-{}", id),
        }
    }
}

/// Classifier dispatching to the configured strategy.
#[derive(Debug, Clone)]
pub struct Classifier {
    config: ClassifierConfig,
    table: KnownAppTable,
}

impl Classifier {
    pub fn new(config: ClassifierConfig, table: KnownAppTable) -> Self {
        Self { config, table }
    }

    pub fn strategy(&self) -> Strategy {
        self.config.strategy
    }

    /// Classify a batch of normalized vectors, one result per sample in
    /// batch order. `batch` supplies the sample names the lookup and k-NN
    /// training labels come from.
    pub fn classify(
        &self,
        batch: &SampleBatch,
        normalized: &[FeatureVector],
    ) -> Result<Vec<Classification>> {
        if batch.len() != normalized.len() {
            return Err(FlowprintError::InvalidDimension {
                expected: batch.len(),
                got: normalized.len(),
            });
        }

        info!(strategy = %self.config.strategy, samples = batch.len(), "classifying batch");

        match self.config.strategy {
            Strategy::Lookup => Ok(batch
                .names()
                .map(|name| Classification::Category(self.table.lookup(name).to_string()))
                .collect()),

            Strategy::Knn => {
                let training: Vec<(FeatureVector, String)> = batch
                    .names()
                    .zip(normalized.iter())
                    .filter_map(|(name, vector)| {
                        let category = self.table.lookup(name);
                        (category != UNKNOWN_CATEGORY)
                            .then(|| (vector.clone(), category.to_string()))
                    })
                    .collect();

                debug!(
                    known = training.len(),
                    total = batch.len(),
                    "training k-NN on known-category samples"
                );
                let knn = KnnClassifier::fit(self.config.knn_k, training)?;
                Ok(knn
                    .predict_batch(normalized)
                    .into_iter()
                    .map(Classification::Category)
                    .collect())
            }

            Strategy::KMeans => {
                let model = KMeans::fit(normalized, &self.config.clustering)?;
                debug!(inertia = model.inertia(), k = model.k(), "k-means fitted");
                Ok(model
                    .assign_batch(normalized)
                    .into_iter()
                    .map(Classification::Cluster)
                    .collect())
            }

            Strategy::Gmm => {
                let model = GaussianMixture::fit(normalized, &self.config.clustering)?;
                debug!(
                    log_likelihood = model.log_likelihood(),
                    k = model.k(),
                    "Gaussian mixture fitted"
                );
                Ok(model
                    .predict_batch(normalized)
                    .into_iter()
                    .map(Classification::Cluster)
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PacketRecord, Sample};
    use crate::ml::{ClusteringConfig, NUM_FEATURES};

    fn named_batch(names: &[&str]) -> SampleBatch {
        names
            .iter()
            .map(|name| {
                let records = (0..4)
                    .map(|i| PacketRecord::new(i as f64 * 0.1, 100))
                    .collect();
                Sample::new(*name, records)
            })
            .collect()
    }

    fn vectors(names: &[&str], firsts: &[f64]) -> Vec<FeatureVector> {
        names
            .iter()
            .zip(firsts.iter())
            .map(|(name, &first)| {
                let mut features = [0.0; NUM_FEATURES];
                features[0] = first;
                FeatureVector::new(*name, features)
            })
            .collect()
    }

    fn config(strategy: Strategy) -> ClassifierConfig {
        ClassifierConfig {
            strategy,
            knn_k: 3,
            clustering: ClusteringConfig {
                clusters: 2,
                seed: Some(42),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_lookup_strategy() {
        let batch = named_batch(&["Zoom_call_1", "zoom-meeting", "mystery"]);
        let normalized = vectors(&["Zoom_call_1", "zoom-meeting", "mystery"], &[0.0, 1.0, 2.0]);

        let classifier = Classifier::new(config(Strategy::Lookup), KnownAppTable::default());
        let results = classifier.classify(&batch, &normalized).unwrap();

        assert_eq!(
            results[0],
            Classification::Category("Video Conferencing".to_string())
        );
        assert_eq!(results[0], results[1]);
        assert_eq!(
            results[2],
            Classification::Category(UNKNOWN_CATEGORY.to_string())
        );
    }

    #[test]
    fn test_knn_classifies_unknowns() {
        let names = ["Zoom_a", "Zoom_b", "Zoom_c", "mystery"];
        let batch = named_batch(&names);
        let normalized = vectors(&names, &[0.0, 0.1, -0.1, 0.05]);

        let classifier = Classifier::new(config(Strategy::Knn), KnownAppTable::default());
        let results = classifier.classify(&batch, &normalized).unwrap();

        for result in &results {
            assert_eq!(result.category(), Some("Video Conferencing"));
        }
    }

    #[test]
    fn test_knn_without_known_samples_fails() {
        let names = ["mystery_1", "mystery_2", "mystery_3"];
        let batch = named_batch(&names);
        let normalized = vectors(&names, &[0.0, 1.0, 2.0]);

        let classifier = Classifier::new(config(Strategy::Knn), KnownAppTable::default());
        assert!(matches!(
            classifier.classify(&batch, &normalized),
            Err(FlowprintError::UntrainedClassifier)
        ));
    }

    #[test]
    fn test_clustering_yields_cluster_ids() {
        let names = ["a", "b", "c", "d"];
        let batch = named_batch(&names);
        let normalized = vectors(&names, &[0.0, 0.1, 10.0, 10.1]);

        let classifier = Classifier::new(config(Strategy::KMeans), KnownAppTable::default());
        let results = classifier.classify(&batch, &normalized).unwrap();

        for result in &results {
            let id = result.cluster().expect("clustering yields ids");
            assert!(id < 2);
        }
        assert_eq!(results[0], results[1]);
        assert_ne!(results[0], results[2]);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let batch = named_batch(&["a", "b"]);
        let normalized = vectors(&["a"], &[0.0]);

        let classifier = Classifier::new(config(Strategy::Lookup), KnownAppTable::default());
        assert!(matches!(
            classifier.classify(&batch, &normalized),
            Err(FlowprintError::InvalidDimension { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("knn".parse::<Strategy>().unwrap(), Strategy::Knn);
        assert_eq!("K-Means".parse::<Strategy>().unwrap(), Strategy::KMeans);
        assert!("nearest".parse::<Strategy>().is_err());
    }
}
