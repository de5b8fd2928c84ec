//! Traffic capture fingerprinting and application classification.
//!
//! Turns raw per-packet records (one capture per application/session) into a
//! six-dimensional statistical fingerprint per capture and assigns each
//! fingerprint a traffic category by known-app lookup, supervised
//! nearest-neighbor classification, or unsupervised clustering.
//!
//! # Example
//! ```ignore
//! use flowprint::{Config, Pipeline};
//! use flowprint::ingest::read_capture_dir;
//!
//! let batch = read_capture_dir("./captures".as_ref())?;
//! let report = Pipeline::new(Config::default()).run(&batch)?;
//! for row in &report.rows {
//!     println!("{} -> {}", row.name, row.prediction);
//! }
//! ```

pub mod classify;
pub mod config;
pub mod core;
pub mod error;
pub mod ingest;
pub mod ml;
pub mod report;

use tracing::info;

pub use classify::{Classification, Classifier, KnownAppTable, Strategy};
pub use config::Config;
pub use core::{PacketRecord, RawRecord, Sample, SampleBatch};
pub use error::{FlowprintError, Result};
pub use ingest::Ingestor;
pub use ml::{FeatureExtractor, FeatureVector, Normalizer, FEATURE_NAMES, NUM_FEATURES};
pub use report::{Aggregator, AnalysisReport, ReportRow};

/// The batch pipeline: extract -> normalize -> classify -> aggregate.
///
/// All samples are extracted before normalization (which needs full-batch
/// statistics), and normalization completes before classification. A run
/// either finishes the whole batch or fails with the offending sample or
/// dimension named; there is no partial result.
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the full pipeline over one batch.
    pub fn run(&self, batch: &SampleBatch) -> Result<AnalysisReport> {
        if batch.is_empty() {
            return Err(FlowprintError::EmptyBatch);
        }

        info!(samples = batch.len(), "extracting features");
        let extractor = FeatureExtractor::new().with_parallel(self.config.extraction.parallel);
        let raw = extractor.extract_batch(batch)?;

        let normalizer = Normalizer::fit(&raw)?;
        let normalized = normalizer.transform_batch(&raw);

        let classifier = Classifier::new(
            self.config.classifier.clone(),
            self.config.known_apps.clone(),
        );
        let predictions = classifier.classify(batch, &normalized)?;

        let report = Aggregator::assemble(batch, &raw, &predictions)?;
        info!(rows = report.len(), "batch run complete");
        Ok(report)
    }
}
