//! Deep Support Vector Data Description (Deep SVDD) for one-class anomaly
//! detection.
//!
//! A neural embedder is trained so that normal samples map close to a fixed
//! center `c` in representation space. The anomaly score of a sample is its
//! squared distance to `c` (higher = more anomalous). Under the
//! soft-boundary objective a radius `R` is tracked alongside the network.

pub mod center;
pub mod error;
pub mod inference;
pub mod model;
pub mod objective;
pub mod persistence;
pub mod radius;
pub mod svdd;
pub mod training;

pub use error::{Result, SvddError};
pub use inference::{Detection, Detector, SvddScorer};
pub use model::embedder::{
    Embedder, LinearEmbedder, LinearEmbedderConfig, MlpEmbedder, MlpEmbedderConfig,
};
pub use objective::Objective;
pub use svdd::{DeepSvdd, SvddState};
pub use training::data::{Dataset, Sample};
pub use training::metrics::{EpochMetrics, FitReport};
pub use training::trainer::SvddTrainingConfig;
