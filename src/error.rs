//src/error.rs

use thiserror::Error;

/// Everything that can abort the analysis of one genome.
#[derive(Debug, Error)]
pub enum HgtError {
    /// Too few values for a bandwidth estimate or a grid search.
    #[error("Cannot {action} on {n} data point(s).")]
    InsufficientData { action: &'static str, n: usize },

    /// The density curve has no peak followed by a valley.
    #[error("Cannot identify at least two peaks.")]
    NoBimodality,

    /// The first valley lies before (or above) the first peak.
    #[error("Peak is larger than valley.")]
    InvertedHill,

    #[error("Close group under {taxid} has {size} taxa, {required} required, and the root is reached.")]
    GroupConstraint {
        taxid: String,
        size: usize,
        required: usize,
    },

    #[error("Refinement would remove every one of the {ring_size} HGT-labeled genes.")]
    EmptyCluster { ring_size: usize },

    #[error("Unknown taxon id: {0}")]
    UnknownTaxon(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HgtError {
    /// True for the errors raised when a density curve is not separable.
    pub fn is_shape(&self) -> bool {
        matches!(self, HgtError::NoBimodality | HgtError::InvertedHill)
    }
}

pub type Result<T> = std::result::Result<T, HgtError>;
