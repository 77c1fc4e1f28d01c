//! Distance and loss functions for Deep SVDD training.
//!
//! All functions are generic over `B: Backend` and operate on burn tensors.
//! The center and radius enter as constants, so gradients flow only into
//! the representations (and through them into the model parameters).

use burn::prelude::*;

use crate::objective::Objective;

/// Per-sample squared Euclidean distance to the center.
///
/// # Arguments
/// - `representations`: shape `(batch, d)`
/// - `center`: shape `(d,)`
///
/// # Returns
/// Shape `(batch,)`.
pub fn squared_distances<B: Backend>(
    representations: Tensor<B, 2>,
    center: Tensor<B, 1>,
) -> Tensor<B, 1> {
    let center = center.unsqueeze::<2>(); // (1, d), broadcast over batch
    (representations - center)
        .powf_scalar(2.0)
        .sum_dim(1)
        .squeeze::<1>(1)
}

/// One-class loss: mean squared distance.
pub fn one_class_loss<B: Backend>(distances: Tensor<B, 1>) -> Tensor<B, 1> {
    distances.mean()
}

/// Soft-boundary loss: `R² + (1/nu) · mean(max(dist − R², 0))`.
pub fn soft_boundary_loss<B: Backend>(distances: Tensor<B, 1>, radius: f64, nu: f64) -> Tensor<B, 1> {
    let r2 = radius * radius;
    let penalty = distances.sub_scalar(r2).clamp_min(0.0);
    penalty.mean().mul_scalar(1.0 / nu).add_scalar(r2)
}

/// Dispatch to the loss for `objective`. Returns a scalar tensor of shape `(1,)`.
pub fn svdd_loss<B: Backend>(
    objective: Objective,
    distances: Tensor<B, 1>,
    radius: f64,
    nu: f64,
) -> Tensor<B, 1> {
    match objective {
        Objective::OneClass => one_class_loss(distances),
        Objective::SoftBoundary => soft_boundary_loss(distances, radius, nu),
    }
}
