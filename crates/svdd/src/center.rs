//! Hypersphere center estimation.
//!
//! The center is the mean representation of the training set, computed once
//! before the epoch loop and never touched by gradient descent.

use burn::prelude::*;

use crate::error::{Result, SvddError};
use crate::model::bridge::{rows_to_tensor, tensor_to_rows};
use crate::model::embedder::Embedder;
use crate::training::data::Dataset;

/// Default collapse-guard magnitude.
pub const DEFAULT_CENTER_EPS: f64 = 1e-3;

/// Compute the mean representation of `dataset` under `model`.
///
/// `model` should be the inference-mode module (`AutodiffModule::valid`)
/// so no gradients are tracked. Samples are forwarded in chunks of
/// `batch_size`. The mean is accumulated in f64 and then passed through
/// [`clamp_center`].
pub fn estimate_center<B: Backend, M: Embedder<B>>(
    model: &M,
    dataset: &Dataset,
    eps: f64,
    batch_size: usize,
    device: &B::Device,
) -> Result<Vec<f32>> {
    if dataset.is_empty() {
        return Err(SvddError::EmptyDataset);
    }
    if batch_size == 0 {
        return Err(SvddError::InvalidBatchSize(batch_size));
    }
    dataset.check_feature_len(model.input_dim())?;

    let dim = model.output_dim();
    let mut sums = vec![0.0_f64; dim];
    let rows: Vec<&[f32]> = dataset.rows().collect();

    for chunk in rows.chunks(batch_size) {
        let representations = model.forward(rows_to_tensor::<B>(chunk, device));
        for repr in tensor_to_rows(representations)? {
            if repr.len() != dim {
                return Err(SvddError::DimensionMismatch {
                    expected: dim,
                    got: repr.len(),
                });
            }
            for (acc, v) in sums.iter_mut().zip(&repr) {
                *acc += *v as f64;
            }
        }
    }

    let n = dataset.len() as f64;
    let mean: Vec<f64> = sums.into_iter().map(|s| s / n).collect();
    Ok(clamp_center(&mean, eps))
}

/// Push near-zero coordinates away from the origin.
///
/// Any coordinate with `|v| < eps` becomes `-eps` when negative and `+eps`
/// otherwise (zero included). A center at the origin would let a network
/// with zero weights reach zero loss for every input.
pub fn clamp_center(mean: &[f64], eps: f64) -> Vec<f32> {
    mean.iter()
        .map(|&v| {
            let v = if v.abs() < eps {
                if v < 0.0 {
                    -eps
                } else {
                    eps
                }
            } else {
                v
            };
            v as f32
        })
        .collect()
}
