//! Supervised k-nearest-neighbor classification.
//!
//! Trained on the subset of samples whose category is already known from the
//! lookup table; classifies every sample in the batch, including the ones
//! that were unknown. Distances are Euclidean in normalized feature space.

use std::collections::HashMap;

use tracing::debug;

use super::features::FeatureVector;
use crate::error::{FlowprintError, Result};

/// k-NN classifier over normalized feature vectors.
#[derive(Debug, Clone)]
pub struct KnnClassifier {
    k: usize,
    training: Vec<(FeatureVector, String)>,
}

impl KnnClassifier {
    /// Fit on (normalized vector, category) pairs. There is nothing to fit
    /// from an empty training set, so that is an error, not a degraded mode.
    pub fn fit(k: usize, training: Vec<(FeatureVector, String)>) -> Result<Self> {
        if training.is_empty() {
            return Err(FlowprintError::UntrainedClassifier);
        }

        debug!(
            neighbors = k,
            training = training.len(),
            "fitted k-NN classifier"
        );
        Ok(Self { k: k.max(1), training })
    }

    /// Number of neighbors actually voting (clamped to the training size).
    pub fn effective_k(&self) -> usize {
        self.k.min(self.training.len())
    }

    /// Classify one vector by majority vote among the nearest neighbors.
    /// Ties break toward the class with the smallest summed distance, then
    /// toward the lexicographically smaller label so results are stable.
    pub fn predict(&self, vector: &FeatureVector) -> String {
        let mut neighbors: Vec<(f64, &str)> = self
            .training
            .iter()
            .map(|(tv, label)| (vector.distance(tv), label.as_str()))
            .collect();
        neighbors.sort_by(|a, b| a.0.total_cmp(&b.0));

        let k = self.effective_k();
        let mut votes: HashMap<&str, (usize, f64)> = HashMap::new();
        for &(distance, label) in &neighbors[..k] {
            let entry = votes.entry(label).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += distance;
        }

        let mut best: Option<(&str, usize, f64)> = None;
        for (label, (count, total)) in votes {
            let better = match best {
                None => true,
                Some((best_label, best_count, best_total)) => {
                    count > best_count
                        || (count == best_count
                            && (total < best_total
                                || (total == best_total && label < best_label)))
                }
            };
            if better {
                best = Some((label, count, total));
            }
        }

        best.map(|(label, _, _)| label.to_string())
            .unwrap_or_default()
    }

    /// Classify a batch, preserving input order.
    pub fn predict_batch(&self, vectors: &[FeatureVector]) -> Vec<String> {
        vectors.iter().map(|v| self.predict(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::features::NUM_FEATURES;

    fn vector(name: &str, first: f64) -> FeatureVector {
        let mut features = [0.0; NUM_FEATURES];
        features[0] = first;
        FeatureVector::new(name, features)
    }

    #[test]
    fn test_empty_training_set_is_error() {
        assert!(matches!(
            KnnClassifier::fit(3, vec![]),
            Err(FlowprintError::UntrainedClassifier)
        ));
    }

    #[test]
    fn test_single_class_absorbs_everything() {
        let training = vec![
            (vector("a", 0.0), "Streaming".to_string()),
            (vector("b", 1.0), "Streaming".to_string()),
            (vector("c", 2.0), "Streaming".to_string()),
        ];
        let knn = KnnClassifier::fit(3, training).unwrap();

        assert_eq!(knn.predict(&vector("x", -5.0)), "Streaming");
        assert_eq!(knn.predict(&vector("y", 100.0)), "Streaming");
        assert_eq!(knn.predict(&vector("a", 0.0)), "Streaming");
    }

    #[test]
    fn test_majority_vote() {
        let training = vec![
            (vector("a", 0.0), "Chat".to_string()),
            (vector("b", 0.2), "Chat".to_string()),
            (vector("c", 10.0), "Streaming".to_string()),
        ];
        let knn = KnnClassifier::fit(3, training).unwrap();

        // Two Chat neighbors outvote one Streaming neighbor
        assert_eq!(knn.predict(&vector("x", 0.1)), "Chat");
    }

    #[test]
    fn test_tie_breaks_by_total_distance() {
        let training = vec![
            (vector("a", -1.0), "Near".to_string()),
            (vector("b", 2.0), "Far".to_string()),
        ];
        // k = 2 -> one vote each; "Near" is closer to the query at 0.0
        let knn = KnnClassifier::fit(2, training).unwrap();
        assert_eq!(knn.predict(&vector("x", 0.0)), "Near");
    }

    #[test]
    fn test_k_clamped_to_training_size() {
        let training = vec![(vector("a", 0.0), "Only".to_string())];
        let knn = KnnClassifier::fit(3, training).unwrap();
        assert_eq!(knn.effective_k(), 1);
        assert_eq!(knn.predict(&vector("x", 9.0)), "Only");
    }

    #[test]
    fn test_batch_order() {
        let training = vec![
            (vector("a", 0.0), "Low".to_string()),
            (vector("b", 10.0), "High".to_string()),
        ];
        let knn = KnnClassifier::fit(1, training).unwrap();

        let queries = vec![vector("q1", 9.0), vector("q2", 1.0)];
        assert_eq!(knn.predict_batch(&queries), vec!["High", "Low"]);
    }
}
