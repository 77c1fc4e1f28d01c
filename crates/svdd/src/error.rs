//! Error types for the Deep SVDD estimator.

/// Errors raised by training, scoring, and persistence.
///
/// Configuration errors are raised before any work begins. Numerical
/// divergence is never reported here; NaN/Inf propagate into the state.
#[derive(Debug, thiserror::Error)]
pub enum SvddError {
    /// `nu` must lie strictly between 0 and 1.
    #[error("nu must be in (0, 1), got {0}")]
    InvalidNu(f64),

    /// Batch size must be positive.
    #[error("batch size must be > 0, got {0}")]
    InvalidBatchSize(usize),

    /// Learning rate must be positive and finite.
    #[error("learning rate must be positive and finite, got {0}")]
    InvalidLearningRate(f64),

    /// Objective string did not name a known variant.
    #[error("unknown objective {0:?} (expected \"one-class\" or \"soft-boundary\")")]
    UnknownObjective(String),

    /// Training or center estimation was given no samples.
    #[error("dataset is empty")]
    EmptyDataset,

    /// A sample's shape or flattened length disagrees with the dataset/model.
    #[error("shape mismatch at sample {index}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        index: usize,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    /// Representation dimension disagrees with the model output or center length.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Scoring or saving was attempted before the center was estimated.
    #[error("center not initialized: call fit() or load() first")]
    CenterNotInitialized,

    /// A persisted artifact holds values that violate the state invariants.
    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),

    /// Filesystem error while reading or writing an artifact or dataset.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed JSON in a dataset line or the state file.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Tensor contents could not be read back as the expected f32 values.
    #[error("tensor data error: {0}")]
    TensorData(String),
    /// burn recorder failure while saving or loading model parameters.
    #[error("model record error: {0}")]
    Record(String),
}

/// Result alias for Deep SVDD operations.
pub type Result<T> = std::result::Result<T, SvddError>;

/// Check that `nu` lies strictly inside (0, 1).
pub fn validate_nu(nu: f64) -> Result<()> {
    if nu > 0.0 && nu < 1.0 {
        Ok(())
    } else {
        Err(SvddError::InvalidNu(nu))
    }
}
