//! Result aggregation.
//!
//! Zips sample names, raw (pre-normalization) feature vectors and
//! classification outcomes into one ordered table for downstream reporting.
//! Row order is the batch ingestion order, an explicit contract rather than
//! an accident of collection iteration. Pure data assembly, no computation
//! and no formatting; consumers render the table however they like.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::Classification;
use crate::core::SampleBatch;
use crate::error::{FlowprintError, Result};
use crate::ml::FeatureVector;

/// One output row per sample. Features are the raw values so reports stay
/// human-readable; normalization is internal to classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub name: String,
    pub avg_packet_size: f64,
    pub std_packet_size: f64,
    pub avg_interval: f64,
    pub std_interval: f64,
    pub packet_count: u64,
    pub flow_entropy: f64,
    pub prediction: Classification,
}

/// The assembled result table for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub rows: Vec<ReportRow>,
}

impl AnalysisReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Assembles the final table. Stateless; exists so the assembly contract has
/// one owner.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator;

impl Aggregator {
    /// Zip names, raw features and predictions in batch order. All three
    /// inputs must be parallel arrays over the same samples.
    pub fn assemble(
        batch: &SampleBatch,
        raw_features: &[FeatureVector],
        predictions: &[Classification],
    ) -> Result<AnalysisReport> {
        if raw_features.len() != batch.len() {
            return Err(FlowprintError::InvalidDimension {
                expected: batch.len(),
                got: raw_features.len(),
            });
        }
        if predictions.len() != batch.len() {
            return Err(FlowprintError::InvalidDimension {
                expected: batch.len(),
                got: predictions.len(),
            });
        }

        let rows = batch
            .names()
            .zip(raw_features.iter())
            .zip(predictions.iter())
            .map(|((name, features), prediction)| ReportRow {
                name: name.to_string(),
                avg_packet_size: features.avg_packet_size(),
                std_packet_size: features.std_packet_size(),
                avg_interval: features.avg_interval(),
                std_interval: features.std_interval(),
                packet_count: features.packet_count().round() as u64,
                flow_entropy: features.flow_entropy(),
                prediction: prediction.clone(),
            })
            .collect();

        Ok(AnalysisReport {
            generated_at: Utc::now(),
            rows,
        })
    }
}
