//! Deep SVDD training loop.
//!
//! Estimates the center once, then runs shuffled mini-batch epochs with a
//! single Adam optimizer on the embedder. Under the soft-boundary objective
//! the radius is re-estimated from each batch right after its optimizer step.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;

use crate::center::{estimate_center, DEFAULT_CENTER_EPS};
use crate::error::{validate_nu, SvddError};
use crate::model::bridge::{rows_to_tensor, tensor_to_f64, tensor_to_vec, vector_to_tensor};
use crate::model::embedder::Embedder;
use crate::objective::Objective;
use crate::radius::estimate_radius;
use crate::svdd::SvddState;
use crate::training::data::{epoch_batches, Dataset};
use crate::training::loss::{squared_distances, svdd_loss};
use crate::training::metrics::{EpochMetrics, FitReport};

/// Configuration for Deep SVDD training.
#[derive(Config, Debug)]
pub struct SvddTrainingConfig {
    /// Loss objective.
    #[config(default = "Objective::OneClass")]
    pub objective: Objective,
    /// Expected outlier fraction, strictly inside (0, 1).
    #[config(default = 0.1)]
    pub nu: f64,
    /// Samples per optimizer step.
    #[config(default = 128)]
    pub batch_size: usize,
    /// Adam learning rate.
    #[config(default = 1e-3)]
    pub lr: f64,
    /// Number of passes over the dataset.
    #[config(default = 10)]
    pub epochs: usize,
    /// Collapse-guard magnitude for the center.
    #[config(default = "DEFAULT_CENTER_EPS")]
    pub center_eps: f64,
    /// Seed for the shuffling RNG. Only read by callers that build the RNG
    /// from the config; `fit` always uses the RNG it is given.
    pub seed: Option<u64>,
    /// Show a per-epoch progress bar.
    #[config(default = false)]
    pub verbose: bool,
}

impl SvddTrainingConfig {
    /// Reject hyperparameters that would make training meaningless.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.batch_size == 0 {
            return Err(SvddError::InvalidBatchSize(self.batch_size));
        }
        validate_nu(self.nu)?;
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(SvddError::InvalidLearningRate(self.lr));
        }
        Ok(())
    }
}

/// Run the Deep SVDD training loop.
///
/// On success `model` holds the trained parameters, `state.center` the
/// center estimated at the start of this call, and (soft-boundary only)
/// `state.radius` the radius of the last batch.
///
/// Every precondition is checked before anything is touched: on `Err`,
/// `model` and `state` are unchanged.
///
/// # Arguments
/// - `config`: training hyperparameters
/// - `model`: autodiff embedder, updated in place
/// - `state`: center/radius record, updated in place
/// - `dataset`: training samples (not modified)
/// - `rng`: source of the per-epoch permutations
/// - `device`: burn device for tensor operations
pub fn fit<B, M>(
    config: &SvddTrainingConfig,
    model: &mut M,
    state: &mut SvddState,
    dataset: &Dataset,
    rng: &mut impl Rng,
    device: &B::Device,
) -> crate::error::Result<FitReport>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + Embedder<B>,
    M::InnerModule: Embedder<B::InnerBackend>,
{
    fit_with_cancel(config, model, state, dataset, rng, device, None)
}

/// [`fit`] with a cooperative cancellation flag checked before each batch.
///
/// When the flag is raised, the current epoch stops at the next batch
/// boundary, its partial metrics are recorded, and the report is marked
/// `cancelled`. Parameters and radius keep the values of the last completed
/// batch.
pub fn fit_with_cancel<B, M>(
    config: &SvddTrainingConfig,
    model: &mut M,
    state: &mut SvddState,
    dataset: &Dataset,
    rng: &mut impl Rng,
    device: &B::Device,
    cancel: Option<&AtomicBool>,
) -> crate::error::Result<FitReport>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + Embedder<B>,
    M::InnerModule: Embedder<B::InnerBackend>,
{
    config.validate()?;
    if dataset.is_empty() {
        return Err(SvddError::EmptyDataset);
    }
    dataset.check_feature_len(model.input_dim())?;

    tracing::info!(
        samples = dataset.len(),
        epochs = config.epochs,
        batch_size = config.batch_size,
        objective = %config.objective,
        nu = config.nu,
        lr = config.lr,
        "Starting Deep SVDD training"
    );

    // Center is fixed for the whole call, computed without gradient tracking.
    let center = estimate_center::<B::InnerBackend, _>(
        &model.valid(),
        dataset,
        config.center_eps,
        config.batch_size,
        device,
    )?;
    let center_norm = center.iter().map(|v| (*v as f64).powi(2)).sum::<f64>().sqrt();
    tracing::info!(dim = center.len(), norm = center_norm, "Center initialized");

    let center_tensor = vector_to_tensor::<B>(&center, device);
    state.center = Some(center);

    let mut current = model.clone();
    let mut optimizer = AdamConfig::new().init();
    let uses_radius = config.objective.uses_radius();
    let mut report = FitReport::new();
    let train_start = Instant::now();

    'epochs: for epoch in 0..config.epochs {
        let epoch_start = Instant::now();
        let batches = epoch_batches(dataset.len(), config.batch_size, rng);
        let pb = progress_bar(config.verbose, batches.len(), epoch);

        let mut last_loss = f64::NAN;
        let mut processed = 0usize;

        for (batch_idx, indices) in batches.iter().enumerate() {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                report.cancelled = true;
                break;
            }

            let rows = dataset.gather(indices);
            let representations = current.forward(rows_to_tensor::<B>(&rows, device));
            let distances = squared_distances(representations, center_tensor.clone());

            // Radius is re-estimated from this batch's pre-step distances.
            let batch_distances = if uses_radius {
                tensor_to_vec::<B>(distances.clone())?
            } else {
                Vec::new()
            };

            let loss = svdd_loss(config.objective, distances, state.radius, config.nu);
            let loss_val = tensor_to_f64::<B>(loss.clone());

            let grads = GradientsParams::from_grads(loss.backward(), &current);
            current = optimizer.step(config.lr, current, grads);

            if uses_radius {
                state.radius = estimate_radius(&batch_distances, config.nu);
            }

            last_loss = loss_val;
            processed += 1;
            tracing::debug!(
                epoch,
                batch = batch_idx,
                size = indices.len(),
                loss = loss_val,
                radius = state.radius,
                "Batch complete"
            );
            pb.inc(1);
        }
        pb.finish_and_clear();

        if processed > 0 {
            let metrics = EpochMetrics {
                epoch,
                loss: last_loss,
                radius: state.radius,
                batches: processed,
                elapsed_secs: epoch_start.elapsed().as_secs_f64(),
            };
            tracing::info!(
                epoch,
                loss = format!("{:.4}", metrics.loss),
                radius = format!("{:.4}", metrics.radius),
                elapsed_secs = format!("{:.2}", metrics.elapsed_secs),
                "Epoch complete"
            );
            report.push(metrics);
        }

        if report.cancelled {
            tracing::warn!(epoch, "Training cancelled at batch boundary");
            break 'epochs;
        }
    }

    *model = current;

    tracing::info!(
        epochs = report.epochs.len(),
        final_loss = ?report.final_loss(),
        radius = state.radius,
        elapsed_secs = format!("{:.1}", train_start.elapsed().as_secs_f64()),
        "Training loop finished"
    );

    Ok(report)
}

fn progress_bar(verbose: bool, len: usize, epoch: usize) -> ProgressBar {
    if !verbose {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb.set_message(format!("epoch {epoch}"));
    pb
}
