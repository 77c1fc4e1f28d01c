//! Result types written by the `score`, `detect`, and `train` subcommands.

use serde::{Deserialize, Serialize};
use svdd::{Detection, FitReport};

/// Summary statistics over a set of anomaly scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub p95: f64,
}

impl ScoreSummary {
    /// Summarize `scores`. All fields are 0 for empty input.
    pub fn from_scores(scores: &[f64]) -> Self {
        if scores.is_empty() {
            return Self::default();
        }
        let mut sorted = scores.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let n = sorted.len();
        Self {
            count: n,
            min: sorted[0],
            max: sorted[n - 1],
            mean: sorted.iter().sum::<f64>() / n as f64,
            median: median(&mut sorted),
            p95: sorted[((n as f64 * 0.95) as usize).min(n - 1)],
        }
    }
}

/// Output of the `score` subcommand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    /// Artifact directory the scores came from.
    pub model: String,
    /// Dataset that was scored.
    pub data: String,
    pub summary: ScoreSummary,
    /// One score per sample, in input order.
    pub scores: Vec<f64>,
}

/// Output of the `detect` subcommand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    pub model: String,
    pub data: String,
    pub threshold: f64,
    pub total: usize,
    pub anomalies: usize,
    /// Fraction flagged (anomalies / total); 0 for empty input.
    pub anomaly_rate: f64,
    pub detections: Vec<Detection>,
}

impl DetectionReport {
    pub fn new(model: String, data: String, threshold: f64, detections: Vec<Detection>) -> Self {
        let total = detections.len();
        let anomalies = detections.iter().filter(|d| d.is_anomaly).count();
        let anomaly_rate = if total == 0 {
            0.0
        } else {
            anomalies as f64 / total as f64
        };
        Self {
            model,
            data,
            threshold,
            total,
            anomalies,
            anomaly_rate,
            detections,
        }
    }
}

/// Per-epoch record written next to a trained artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch: usize,
    pub loss: f64,
    pub radius: f64,
    pub batches: usize,
    pub elapsed_secs: f64,
}

/// Output of the `train` subcommand (`train_report.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainReport {
    pub objective: String,
    pub samples: usize,
    pub radius: f64,
    pub cancelled: bool,
    pub epochs: Vec<EpochRecord>,
}

impl TrainReport {
    pub fn from_fit(objective: String, samples: usize, radius: f64, report: &FitReport) -> Self {
        Self {
            objective,
            samples,
            radius,
            cancelled: report.cancelled,
            epochs: report
                .epochs
                .iter()
                .map(|m| EpochRecord {
                    epoch: m.epoch,
                    loss: m.loss,
                    radius: m.radius,
                    batches: m.batches,
                    elapsed_secs: m.elapsed_secs,
                })
                .collect(),
        }
    }
}

/// Compute the median of a slice of f64 values.
///
/// Returns 0.0 for empty slices.
pub fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
