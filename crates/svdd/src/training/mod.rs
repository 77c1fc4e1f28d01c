//! Deep SVDD training pipeline: dataset and batch scheduling, loss
//! functions, epoch metrics, and the Adam training loop.

pub mod data;
pub mod loss;
pub mod metrics;
pub mod trainer;
