//! Anomaly scoring and threshold decisions.
//!
//! [`score`] is the pure scoring function. [`SvddScorer`] bundles an
//! inference-mode embedder with its center, and [`Detector`] pairs each score
//! with a threshold decision.
//!
//! Convention: **higher score = more anomalous** (squared distance to the
//! center, not normalized by dimension or radius).

use std::path::Path;

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SvddError};
use crate::model::bridge::{rows_to_tensor, tensor_to_vec, vector_to_tensor};
use crate::model::embedder::Embedder;
use crate::persistence;
use crate::training::data::Dataset;
use crate::training::loss::squared_distances;

/// Default chunk size for batched forward passes during scoring.
pub const DEFAULT_SCORE_BATCH_SIZE: usize = 128;

/// Score every sample in `samples`, in input order.
///
/// `model` should be the inference-mode module. Samples are forwarded in
/// chunks of `batch_size`; chunking never changes the result order.
///
/// # Errors
/// `InvalidBatchSize` for a zero batch size, `DimensionMismatch` when the
/// center length differs from the model output, `ShapeMismatch` when the
/// samples do not fit the model input. An empty dataset scores to an empty
/// vector.
pub fn score<B: Backend, M: Embedder<B>>(
    model: &M,
    center: &[f32],
    samples: &Dataset,
    batch_size: usize,
    device: &B::Device,
) -> Result<Vec<f64>> {
    if batch_size == 0 {
        return Err(SvddError::InvalidBatchSize(batch_size));
    }
    if center.len() != model.output_dim() {
        return Err(SvddError::DimensionMismatch {
            expected: model.output_dim(),
            got: center.len(),
        });
    }
    if samples.is_empty() {
        return Ok(vec![]);
    }
    samples.check_feature_len(model.input_dim())?;

    let center_tensor = vector_to_tensor::<B>(center, device);
    let rows: Vec<&[f32]> = samples.rows().collect();
    let mut scores = Vec::with_capacity(rows.len());

    for chunk in rows.chunks(batch_size) {
        let representations = model.forward(rows_to_tensor::<B>(chunk, device));
        let distances = squared_distances(representations, center_tensor.clone());
        scores.extend(tensor_to_vec::<B>(distances)?);
    }

    Ok(scores)
}

/// Inference-mode embedder paired with its center.
pub struct SvddScorer<B: Backend, M> {
    model: M,
    center: Vec<f32>,
    batch_size: usize,
    device: B::Device,
}

impl<B: Backend, M: Embedder<B>> SvddScorer<B, M> {
    /// Create a scorer, checking that the center fits the model output.
    pub fn new(model: M, center: Vec<f32>, device: B::Device) -> Result<Self> {
        if center.len() != model.output_dim() {
            return Err(SvddError::DimensionMismatch {
                expected: model.output_dim(),
                got: center.len(),
            });
        }
        Ok(Self {
            model,
            center,
            batch_size: DEFAULT_SCORE_BATCH_SIZE,
            device,
        })
    }

    /// Load a scorer from a saved artifact directory.
    ///
    /// `model` is a freshly initialized module of the saved architecture;
    /// its parameters are replaced by the saved ones.
    pub fn load(model: M, source: &Path, device: B::Device) -> Result<Self> {
        let (model, center, _radius) = persistence::load::<B, M>(model, source, &device)?;
        Self::new(model, center, device)
    }

    /// Override the forward-pass chunk size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn center(&self) -> &[f32] {
        &self.center
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Score a dataset.
    pub fn score(&self, samples: &Dataset) -> Result<Vec<f64>> {
        score(&self.model, &self.center, samples, self.batch_size, &self.device)
    }

    /// Score one flattened sample.
    pub fn score_sample(&self, values: &[f32]) -> Result<f64> {
        let dataset = Dataset::new(vec![values.len()], vec![values.to_vec()])?;
        let scores = self.score(&dataset)?;
        Ok(scores[0])
    }
}

/// One thresholded decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Squared distance to the center.
    pub anomaly_score: f64,
    /// `anomaly_score >= threshold`.
    pub is_anomaly: bool,
}

impl Detection {
    pub fn from_score(anomaly_score: f64, threshold: f64) -> Self {
        Self {
            anomaly_score,
            is_anomaly: anomaly_score >= threshold,
        }
    }
}

/// Decision layer: a scorer plus a fixed, externally chosen threshold.
///
/// The threshold is never learned; it comes from configuration.
pub struct Detector<B: Backend, M> {
    scorer: SvddScorer<B, M>,
    threshold: f64,
}

impl<B: Backend, M: Embedder<B>> Detector<B, M> {
    pub fn new(scorer: SvddScorer<B, M>, threshold: f64) -> Self {
        Self { scorer, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn scorer(&self) -> &SvddScorer<B, M> {
        &self.scorer
    }

    /// Score and classify every sample, in input order.
    pub fn detect(&self, samples: &Dataset) -> Result<Vec<Detection>> {
        let scores = self.scorer.score(samples)?;
        let detections: Vec<Detection> = scores
            .into_iter()
            .map(|s| Detection::from_score(s, self.threshold))
            .collect();
        let anomalies = detections.iter().filter(|d| d.is_anomaly).count();
        tracing::debug!(
            samples = detections.len(),
            anomalies,
            threshold = self.threshold,
            "Detection complete"
        );
        Ok(detections)
    }

    /// Score and classify one flattened sample.
    pub fn detect_sample(&self, values: &[f32]) -> Result<Detection> {
        let s = self.scorer.score_sample(values)?;
        Ok(Detection::from_score(s, self.threshold))
    }
}
