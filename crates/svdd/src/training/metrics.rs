/// Summary of one training epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochMetrics {
    /// Zero-based epoch index.
    pub epoch: usize,
    /// Loss of the epoch's final batch.
    pub loss: f64,
    /// Radius after the epoch's final batch (0 under one-class).
    pub radius: f64,
    /// Number of batches processed.
    pub batches: usize,
    /// Wall-clock seconds spent in the epoch.
    pub elapsed_secs: f64,
}

/// Outcome of a `fit` call.
///
/// The loop never checks for divergence; callers that care inspect
/// [`FitReport::is_finite`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitReport {
    pub epochs: Vec<EpochMetrics>,
    /// Set when a cancellation request stopped the loop early.
    pub cancelled: bool,
}

impl FitReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, metrics: EpochMetrics) {
        self.epochs.push(metrics);
    }

    /// Summary loss of the last completed epoch.
    pub fn final_loss(&self) -> Option<f64> {
        self.epochs.last().map(|m| m.loss)
    }

    /// Radius after the last completed epoch.
    pub fn final_radius(&self) -> Option<f64> {
        self.epochs.last().map(|m| m.radius)
    }

    /// True when every recorded loss and radius is finite.
    pub fn is_finite(&self) -> bool {
        self.epochs
            .iter()
            .all(|m| m.loss.is_finite() && m.radius.is_finite())
    }
}
