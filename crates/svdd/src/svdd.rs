//! The Deep SVDD estimator: an embedder plus the learned center and radius.

use std::path::Path;
use std::sync::atomic::AtomicBool;

use burn::module::AutodiffModule;
use burn::tensor::backend::AutodiffBackend;
use rand::Rng;

use crate::error::{Result, SvddError};
use crate::inference::{self, Detector, SvddScorer, DEFAULT_SCORE_BATCH_SIZE};
use crate::model::embedder::Embedder;
use crate::persistence;
use crate::training::data::Dataset;
use crate::training::metrics::FitReport;
use crate::training::trainer::{self, SvddTrainingConfig};

/// Learned hypersphere: center `c` and radius `R`.
///
/// `center` is `None` until the first successful `fit` or `load`.
/// `radius` stays 0 unless the soft-boundary objective updates it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SvddState {
    pub center: Option<Vec<f32>>,
    pub radius: f64,
}

impl SvddState {
    /// The center, or `CenterNotInitialized`.
    pub fn center(&self) -> Result<&[f32]> {
        self.center.as_deref().ok_or(SvddError::CenterNotInitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.center.is_some()
    }
}

/// Deep SVDD estimator over an autodiff embedder.
///
/// ```ignore
/// let mut svdd = DeepSvdd::new(model, 32, device)?;
/// svdd.fit(&train, &SvddTrainingConfig::new(), &mut rng)?;
/// let scores = svdd.score(&test)?;
/// svdd.save(Path::new("artifacts/run1"))?;
/// ```
pub struct DeepSvdd<B: AutodiffBackend, M> {
    model: M,
    state: SvddState,
    representation_dim: usize,
    score_batch_size: usize,
    device: B::Device,
}

impl<B, M> DeepSvdd<B, M>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + Embedder<B>,
    M::InnerModule: Embedder<B::InnerBackend>,
{
    /// Wrap an embedder whose output width must equal `representation_dim`.
    pub fn new(model: M, representation_dim: usize, device: B::Device) -> Result<Self> {
        if model.output_dim() != representation_dim {
            return Err(SvddError::DimensionMismatch {
                expected: representation_dim,
                got: model.output_dim(),
            });
        }
        Ok(Self {
            model,
            state: SvddState::default(),
            representation_dim,
            score_batch_size: DEFAULT_SCORE_BATCH_SIZE,
            device,
        })
    }

    /// Chunk size for forward passes in [`DeepSvdd::score`].
    pub fn with_score_batch_size(mut self, batch_size: usize) -> Self {
        self.score_batch_size = batch_size;
        self
    }

    /// Train the embedder, re-estimating the center first.
    pub fn fit(
        &mut self,
        dataset: &Dataset,
        config: &SvddTrainingConfig,
        rng: &mut impl Rng,
    ) -> Result<FitReport> {
        self.fit_with_cancel(dataset, config, rng, None)
    }

    /// [`DeepSvdd::fit`] with a cooperative cancellation flag.
    pub fn fit_with_cancel(
        &mut self,
        dataset: &Dataset,
        config: &SvddTrainingConfig,
        rng: &mut impl Rng,
        cancel: Option<&AtomicBool>,
    ) -> Result<FitReport> {
        trainer::fit_with_cancel(
            config,
            &mut self.model,
            &mut self.state,
            dataset,
            rng,
            &self.device,
            cancel,
        )
    }

    /// Anomaly scores for `samples`, one per sample in input order.
    pub fn score(&self, samples: &Dataset) -> Result<Vec<f64>> {
        let center = self.state.center()?;
        inference::score::<B::InnerBackend, _>(
            &self.model.valid(),
            center,
            samples,
            self.score_batch_size,
            &self.device,
        )
    }

    /// Snapshot of the current parameters and center as a standalone scorer.
    pub fn scorer(&self) -> Result<SvddScorer<B::InnerBackend, M::InnerModule>> {
        let center = self.state.center()?.to_vec();
        Ok(SvddScorer::new(self.model.valid(), center, self.device.clone())?
            .with_batch_size(self.score_batch_size))
    }

    /// Snapshot scorer with a fixed decision threshold.
    pub fn detector(&self, threshold: f64) -> Result<Detector<B::InnerBackend, M::InnerModule>> {
        Ok(Detector::new(self.scorer()?, threshold))
    }

    pub fn center(&self) -> Option<&[f32]> {
        self.state.center.as_deref()
    }

    pub fn radius(&self) -> f64 {
        self.state.radius
    }

    pub fn state(&self) -> &SvddState {
        &self.state
    }

    pub fn representation_dim(&self) -> usize {
        self.representation_dim
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    /// Persist parameters, center, and radius under `destination`.
    pub fn save(&self, destination: &Path) -> Result<()> {
        persistence::save::<B, M>(&self.model, &self.state, destination)
    }

    /// Restore an estimator saved with [`DeepSvdd::save`].
    ///
    /// `model` must have the saved architecture; its parameters are replaced.
    pub fn load(model: M, source: &Path, device: B::Device) -> Result<Self> {
        let representation_dim = model.output_dim();
        let (model, center, radius) = persistence::load::<B, M>(model, source, &device)?;
        if center.len() != representation_dim {
            return Err(SvddError::DimensionMismatch {
                expected: representation_dim,
                got: center.len(),
            });
        }
        Ok(Self {
            model,
            state: SvddState {
                center: Some(center),
                radius,
            },
            representation_dim,
            score_batch_size: DEFAULT_SCORE_BATCH_SIZE,
            device,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::embedder::{LinearEmbedder, MlpEmbedderConfig};
    use burn::backend::ndarray::NdArray;
    use burn::backend::Autodiff;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    type TestAutodiffBackend = Autodiff<NdArray<f32>>;

    #[test]
    fn test_state_center_uninitialized() {
        let state = SvddState::default();
        assert!(!state.is_initialized());
        assert!(matches!(state.center(), Err(SvddError::CenterNotInitialized)));
    }

    #[test]
    fn test_new_checks_representation_dim() {
        let device = Default::default();
        let model = MlpEmbedderConfig::new(4)
            .with_d_hidden(4)
            .with_representation_dim(3)
            .init::<TestAutodiffBackend>(&device);
        let res = DeepSvdd::new(model, 5, device);
        assert!(matches!(
            res,
            Err(SvddError::DimensionMismatch { expected: 5, got: 3 })
        ));
    }

    #[test]
    fn test_score_before_fit_fails() {
        let device = Default::default();
        let model = LinearEmbedder::<TestAutodiffBackend>::identity(2, &device);
        let svdd = DeepSvdd::new(model, 2, device).unwrap();
        let ds = Dataset::new(vec![2], vec![vec![1.0, 2.0]]).unwrap();

        assert!(matches!(svdd.score(&ds), Err(SvddError::CenterNotInitialized)));
        assert!(svdd.scorer().is_err());
        assert!(svdd.center().is_none());
    }

    #[test]
    fn test_fit_then_score() {
        let device = Default::default();
        let model = MlpEmbedderConfig::new(3)
            .with_d_hidden(6)
            .with_representation_dim(2)
            .init::<TestAutodiffBackend>(&device);
        let mut svdd = DeepSvdd::new(model, 2, device).unwrap();
        let rows: Vec<Vec<f32>> = (0..12)
            .map(|i| vec![0.2 + 0.01 * i as f32, 0.4, 0.6 - 0.01 * i as f32])
            .collect();
        let ds = Dataset::new(vec![3], rows).unwrap();
        let mut rng = StdRng::seed_from_u64(9);

        svdd.fit(&ds, &SvddTrainingConfig::new().with_batch_size(4).with_epochs(2), &mut rng)
            .unwrap();
        let scores = svdd.score(&ds).unwrap();
        assert_eq!(scores.len(), 12);
        assert!(scores.iter().all(|s| s.is_finite() && *s >= 0.0));

        // The scorer snapshot agrees with the estimator.
        let snapshot = svdd.scorer().unwrap().score(&ds).unwrap();
        assert_eq!(scores, snapshot);
    }
}
