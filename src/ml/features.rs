//! Feature extraction from capture samples.
//!
//! Reduces each sample's packet stream to six summary statistics: packet
//! size mean/spread, inter-arrival mean/spread, packet count, and the
//! Shannon entropy of the size distribution. Streaming shapes separate
//! cleanly in this space (steady media streams sit at low size variance and
//! low entropy, interactive chat at high interval variance).

use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{Sample, SampleBatch};
use crate::error::{FlowprintError, Result};

/// Feature names, in vector order. Every vector in a batch shares this
/// column order; the normalizer and classifiers rely on it.
pub const FEATURE_NAMES: &[&str] = &[
    "avg_packet_size",
    "std_packet_size",
    "avg_interval",
    "std_interval",
    "packet_count",
    "flow_entropy",
];

/// Number of features extracted per sample.
pub const NUM_FEATURES: usize = 6;

/// Minimum packets per sample: the interval standard deviation needs two
/// intervals, so three records. Fewer is an error, never a NaN.
pub const MIN_PACKETS: usize = 3;

/// Fixed-size statistical fingerprint of one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    sample: String,
    features: [f64; NUM_FEATURES],
}

impl FeatureVector {
    pub fn new(sample: impl Into<String>, features: [f64; NUM_FEATURES]) -> Self {
        Self {
            sample: sample.into(),
            features,
        }
    }

    /// Name of the sample this vector was extracted from.
    pub fn sample(&self) -> &str {
        &self.sample
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.features
    }

    /// Get a feature by name.
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|&n| n == name)
            .map(|idx| self.features[idx])
    }

    pub fn avg_packet_size(&self) -> f64 {
        self.features[0]
    }

    pub fn std_packet_size(&self) -> f64 {
        self.features[1]
    }

    pub fn avg_interval(&self) -> f64 {
        self.features[2]
    }

    pub fn std_interval(&self) -> f64 {
        self.features[3]
    }

    /// Integer-valued; stored as f64 so it participates in vector math.
    pub fn packet_count(&self) -> f64 {
        self.features[4]
    }

    pub fn flow_entropy(&self) -> f64 {
        self.features[5]
    }

    /// Euclidean distance to another vector.
    pub fn distance(&self, other: &FeatureVector) -> f64 {
        super::squared_distance(&self.features, &other.features).sqrt()
    }
}

/// Extracts feature vectors from samples. Extraction is independent per
/// sample, so batches can run in parallel; the global stages downstream
/// (normalization, model fitting) stay sequential.
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    parallel: bool,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Extract the six-feature fingerprint of one sample.
    pub fn extract(&self, sample: &Sample) -> Result<FeatureVector> {
        let n = sample.len();
        if n == 0 {
            return Err(FlowprintError::EmptySample {
                name: sample.name().to_string(),
            });
        }
        if n < MIN_PACKETS {
            return Err(FlowprintError::InsufficientPackets {
                name: sample.name().to_string(),
                needed: MIN_PACKETS,
                got: n,
            });
        }

        let sizes: Vec<f64> = sample.sizes().map(f64::from).collect();
        let avg_size = mean(&sizes);
        let std_size = sample_std(&sizes, avg_size);

        let intervals = sample.intervals();
        let avg_interval = mean(&intervals);
        let std_interval = sample_std(&intervals, avg_interval);

        let entropy = shannon_entropy(sample.sizes(), n);

        Ok(FeatureVector::new(
            sample.name(),
            [
                avg_size,
                std_size,
                avg_interval,
                std_interval,
                n as f64,
                entropy,
            ],
        ))
    }

    /// Extract vectors for a whole batch, preserving batch order. Fails on
    /// the first undersized sample; no partial batch escapes.
    pub fn extract_batch(&self, batch: &SampleBatch) -> Result<Vec<FeatureVector>> {
        let vectors = if self.parallel {
            batch
                .samples()
                .par_iter()
                .map(|s| self.extract(s))
                .collect::<Result<Vec<_>>>()?
        } else {
            batch
                .samples()
                .iter()
                .map(|s| self.extract(s))
                .collect::<Result<Vec<_>>>()?
        };

        debug!(samples = vectors.len(), "extracted feature vectors");
        Ok(vectors)
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (divisor n-1).
fn sample_std(values: &[f64], mean: f64) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (sum_sq / (n - 1) as f64).sqrt()
}

/// Shannon entropy (base 2) of the empirical packet-size distribution.
/// Zero iff every packet has the same size; bounded above by
/// log2(distinct sizes).
fn shannon_entropy(sizes: impl Iterator<Item = u32>, n: usize) -> f64 {
    let mut counts: HashMap<u32, usize> = HashMap::new();
    for size in sizes {
        *counts.entry(size).or_insert(0) += 1;
    }

    let n = n as f64;
    let entropy: f64 = -counts
        .values()
        .map(|&count| {
            let p = count as f64 / n;
            p * p.log2()
        })
        .sum::<f64>();

    entropy.max(0.0)
}
