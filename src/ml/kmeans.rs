//! Centroid-based clustering (k-means, Lloyd's algorithm).
//!
//! Runs several random initializations and keeps the partition with the
//! lowest inertia. Cluster ids carry no semantic meaning and may permute
//! between runs unless a seed is fixed.

use rand::seq::index;
use tracing::debug;

use super::features::FeatureVector;
use super::{make_rng, squared_distance, ClusteringConfig};
use crate::error::{FlowprintError, Result};

/// Fitted k-means model.
#[derive(Debug, Clone)]
pub struct KMeans {
    centroids: Vec<Vec<f64>>,
    inertia: f64,
}

impl KMeans {
    /// Fit over a batch of normalized vectors. Requires `0 < k <= n`; every
    /// cluster id in `[0, k)` ends up used (empty clusters are re-seeded to
    /// the point farthest from its centroid).
    pub fn fit(data: &[FeatureVector], config: &ClusteringConfig) -> Result<Self> {
        let n = data.len();
        if n == 0 {
            return Err(FlowprintError::EmptyBatch);
        }
        let k = config.clusters;
        if k == 0 || k > n {
            return Err(FlowprintError::InvalidClusterCount { k, samples: n });
        }

        let points: Vec<&[f64]> = data.iter().map(|v| v.as_slice()).collect();
        let mut rng = make_rng(config.seed);

        let mut best: Option<(Vec<Vec<f64>>, f64)> = None;
        for restart in 0..config.restarts.max(1) {
            let init: Vec<Vec<f64>> = index::sample(&mut rng, n, k)
                .into_iter()
                .map(|i| points[i].to_vec())
                .collect();
            let (centroids, inertia) = lloyd(&points, init, config);

            debug!(restart, inertia, "k-means restart finished");
            if best.as_ref().is_none_or(|(_, bi)| inertia < *bi) {
                best = Some((centroids, inertia));
            }
        }

        let (centroids, inertia) = best.expect("at least one restart ran");
        Ok(Self { centroids, inertia })
    }

    /// Assign one vector to its nearest centroid.
    pub fn assign(&self, vector: &FeatureVector) -> usize {
        nearest(&self.centroids, vector.as_slice()).0
    }

    /// Assign a batch, preserving input order.
    pub fn assign_batch(&self, vectors: &[FeatureVector]) -> Vec<usize> {
        vectors.iter().map(|v| self.assign(v)).collect()
    }

    pub fn centroids(&self) -> &[Vec<f64>] {
        &self.centroids
    }

    /// Sum of squared distances from each training point to its centroid.
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    pub fn k(&self) -> usize {
        self.centroids.len()
    }
}

fn lloyd(
    points: &[&[f64]],
    mut centroids: Vec<Vec<f64>>,
    config: &ClusteringConfig,
) -> (Vec<Vec<f64>>, f64) {
    let n = points.len();
    let k = centroids.len();
    let dims = points[0].len();
    let mut assignments = vec![0usize; n];

    for _ in 0..config.max_iterations.max(1) {
        for (i, point) in points.iter().enumerate() {
            assignments[i] = nearest(&centroids, point).0;
        }
        fix_empty_clusters(points, &centroids, &mut assignments, k);

        // Recompute centroids as member means
        let mut sums = vec![vec![0.0; dims]; k];
        let mut counts = vec![0usize; k];
        for (i, point) in points.iter().enumerate() {
            let cluster = assignments[i];
            counts[cluster] += 1;
            for (d, &value) in point.iter().enumerate() {
                sums[cluster][d] += value;
            }
        }

        let mut shift = 0.0;
        for (cluster, sum) in sums.iter_mut().enumerate() {
            if counts[cluster] == 0 {
                continue;
            }
            for value in sum.iter_mut() {
                *value /= counts[cluster] as f64;
            }
            shift += squared_distance(&centroids[cluster], sum);
            centroids[cluster] = sum.clone();
        }

        if shift < config.tolerance {
            break;
        }
    }

    let inertia: f64 = points
        .iter()
        .enumerate()
        .map(|(i, point)| squared_distance(point, &centroids[assignments[i]]))
        .sum();

    (centroids, inertia)
}

/// Move one point into each empty cluster: the point farthest from its
/// current centroid, taken from clusters that can spare a member.
fn fix_empty_clusters(
    points: &[&[f64]],
    centroids: &[Vec<f64>],
    assignments: &mut [usize],
    k: usize,
) {
    let mut counts = vec![0usize; k];
    for &cluster in assignments.iter() {
        counts[cluster] += 1;
    }

    for empty in 0..k {
        if counts[empty] > 0 {
            continue;
        }

        let farthest = points
            .iter()
            .enumerate()
            .filter(|(i, _)| counts[assignments[*i]] > 1)
            .max_by(|(i, p), (j, q)| {
                squared_distance(p, &centroids[assignments[*i]])
                    .total_cmp(&squared_distance(q, &centroids[assignments[*j]]))
            })
            .map(|(i, _)| i);

        if let Some(idx) = farthest {
            counts[assignments[idx]] -= 1;
            assignments[idx] = empty;
            counts[empty] += 1;
        }
    }
}

fn nearest(centroids: &[Vec<f64>], point: &[f64]) -> (usize, f64) {
    let mut best = (0usize, f64::MAX);
    for (cluster, centroid) in centroids.iter().enumerate() {
        let dist = squared_distance(centroid, point);
        if dist < best.1 {
            best = (cluster, dist);
        }
    }
    best
}
