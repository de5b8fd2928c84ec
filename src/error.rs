use thiserror::Error;

/// Errors surfaced by the fingerprinting pipeline.
///
/// Row-level malformation is never represented here: malformed rows are
/// dropped during ingestion. Everything below is fatal to the batch run and
/// names the offending sample or feature dimension.
#[derive(Debug, Error)]
pub enum FlowprintError {
    #[error("sample '{name}' has no valid packet records after cleaning")]
    EmptySample { name: String },

    #[error("sample '{name}' has {got} packets, need at least {needed} for interval statistics")]
    InsufficientPackets {
        name: String,
        needed: usize,
        got: usize,
    },

    #[error("feature '{dimension}' has zero variance across the batch")]
    DegenerateFeature { dimension: &'static str },

    #[error("no known-category samples available to train the classifier")]
    UntrainedClassifier,

    #[error("cluster count {k} exceeds batch size {samples}")]
    InvalidClusterCount { k: usize, samples: usize },

    #[error("batch contains no samples")]
    EmptyBatch,

    #[error("invalid vector dimension: expected {expected}, got {got}")]
    InvalidDimension { expected: usize, got: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, FlowprintError>;
