//! Gaussian mixture clustering (diagonal covariances, EM).
//!
//! Component means start from a k-means run over the same batch, then EM
//! refines weights/means/variances until the log-likelihood stops moving.
//! Assignment is the highest-posterior component per vector.

use tracing::debug;

use super::features::FeatureVector;
use super::kmeans::KMeans;
use super::ClusteringConfig;
use crate::error::{FlowprintError, Result};

/// Variances are floored here so a tight cluster cannot collapse a
/// component into a zero-width spike.
const VARIANCE_FLOOR: f64 = 1e-6;

/// Fitted Gaussian mixture model.
#[derive(Debug, Clone)]
pub struct GaussianMixture {
    weights: Vec<f64>,
    means: Vec<Vec<f64>>,
    variances: Vec<Vec<f64>>,
    log_likelihood: f64,
    iterations: usize,
}

impl GaussianMixture {
    /// Fit `k` diagonal-covariance components over a batch of normalized
    /// vectors. Requires `0 < k <= n`, same as k-means.
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
        let dims = points[0].len();

        // Initialize from a k-means partition of the same batch
        let kmeans = KMeans::fit(data, config)?;
        let assignments = kmeans.assign_batch(data);

        let mut weights = vec![0.0; k];
        let mut means: Vec<Vec<f64>> = kmeans.centroids().to_vec();
        let mut variances = vec![vec![VARIANCE_FLOOR; dims]; k];

        let mut counts = vec![0usize; k];
        for (i, &cluster) in assignments.iter().enumerate() {
            counts[cluster] += 1;
            for (d, &value) in points[i].iter().enumerate() {
                variances[cluster][d] += (value - means[cluster][d]).powi(2);
            }
        }
        for cluster in 0..k {
            let count = counts[cluster].max(1) as f64;
            weights[cluster] = counts[cluster] as f64 / n as f64;
            for variance in &mut variances[cluster] {
                *variance = (*variance / count).max(VARIANCE_FLOOR);
            }
        }

        // EM refinement
        let mut responsibilities = vec![vec![0.0; k]; n];
        let mut log_likelihood = f64::NEG_INFINITY;
        let mut iterations = 0;

        for iter in 0..config.max_iterations.max(1) {
            iterations = iter + 1;

            // E-step: posteriors via log-sum-exp
            let mut new_ll = 0.0;
            for (i, point) in points.iter().enumerate() {
                let log_probs: Vec<f64> = (0..k)
                    .map(|c| {
                        weights[c].max(f64::MIN_POSITIVE).ln()
                            + log_gaussian_diag(point, &means[c], &variances[c])
                    })
                    .collect();
                let norm = log_sum_exp(&log_probs);
                new_ll += norm;
                for (c, &lp) in log_probs.iter().enumerate() {
                    responsibilities[i][c] = (lp - norm).exp();
                }
            }

            // M-step
            for c in 0..k {
                let weight_sum: f64 = responsibilities.iter().map(|r| r[c]).sum();
                let weight_sum = weight_sum.max(f64::MIN_POSITIVE);
                weights[c] = weight_sum / n as f64;

                for d in 0..dims {
                    let mean: f64 = points
                        .iter()
                        .enumerate()
                        .map(|(i, p)| responsibilities[i][c] * p[d])
                        .sum::<f64>()
                        / weight_sum;
                    means[c][d] = mean;

                    let variance: f64 = points
                        .iter()
                        .enumerate()
                        .map(|(i, p)| responsibilities[i][c] * (p[d] - mean).powi(2))
                        .sum::<f64>()
                        / weight_sum;
                    variances[c][d] = variance.max(VARIANCE_FLOOR);
                }
            }

            if (new_ll - log_likelihood).abs() < config.tolerance {
                log_likelihood = new_ll;
                break;
            }
            log_likelihood = new_ll;
        }

        debug!(iterations, log_likelihood, "fitted Gaussian mixture");
        Ok(Self {
            weights,
            means,
            variances,
            log_likelihood,
            iterations,
        })
    }

    /// Assign one vector to its highest-posterior component.
    pub fn predict(&self, vector: &FeatureVector) -> usize {
        let point = vector.as_slice();
        let mut best = (0usize, f64::NEG_INFINITY);
        for c in 0..self.weights.len() {
            let lp = self.weights[c].max(f64::MIN_POSITIVE).ln()
                + log_gaussian_diag(point, &self.means[c], &self.variances[c]);
            if lp > best.1 {
                best = (c, lp);
            }
        }
        best.0
    }

    /// Assign a batch, preserving input order.
    pub fn predict_batch(&self, vectors: &[FeatureVector]) -> Vec<usize> {
        vectors.iter().map(|v| self.predict(v)).collect()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn means(&self) -> &[Vec<f64>] {
        &self.means
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn k(&self) -> usize {
        self.weights.len()
    }
}

/// Log density of a diagonal-covariance Gaussian.
fn log_gaussian_diag(point: &[f64], mean: &[f64], variance: &[f64]) -> f64 {
    let ln_2pi = (2.0 * std::f64::consts::PI).ln();
    point
        .iter()
        .zip(mean.iter())
        .zip(variance.iter())
        .map(|((&x, &mu), &var)| -0.5 * (ln_2pi + var.ln() + (x - mu).powi(2) / var))
        .sum()
}

fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max.is_infinite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}
