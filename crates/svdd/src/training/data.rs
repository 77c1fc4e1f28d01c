//! Dataset handling and epoch batch scheduling.
//!
//! Samples are preprocessed fixed-shape tensors stored flattened. Loading
//! does not normalize or augment; that belongs to the preprocessing stage
//! upstream.

use std::io::BufRead;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SvddError};

/// One preprocessed input tensor, flattened in row-major order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Tensor shape, e.g. `[height, width, channels]`.
    pub shape: Vec<usize>,
    /// Row-major values, `shape.iter().product()` of them.
    pub values: Vec<f32>,
}

impl Sample {
    pub fn new(shape: Vec<usize>, values: Vec<f32>) -> Self {
        Self { shape, values }
    }
}

/// Element count of `shape`, or `None` on overflow.
fn checked_numel(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// Ordered collection of samples sharing one shape.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    shape: Vec<usize>,
    feature_len: usize,
    rows: Vec<Vec<f32>>,
}

impl Dataset {
    /// Build a dataset from flattened rows of a common `shape`.
    ///
    /// An empty `rows` is accepted (scoring nothing is valid); training
    /// rejects it separately.
    ///
    /// # Errors
    /// `ShapeMismatch` if the shape has a zero dimension, its element count
    /// overflows `usize`, or any row's length differs from that count.
    pub fn new(shape: Vec<usize>, rows: Vec<Vec<f32>>) -> Result<Self> {
        let numel = match checked_numel(&shape) {
            Some(n) if n > 0 && !shape.is_empty() => n,
            _ => {
                return Err(SvddError::ShapeMismatch {
                    index: 0,
                    expected: vec![],
                    got: shape,
                })
            }
        };
        for (index, row) in rows.iter().enumerate() {
            if row.len() != numel {
                return Err(SvddError::ShapeMismatch {
                    index,
                    expected: vec![numel],
                    got: vec![row.len()],
                });
            }
        }
        Ok(Self {
            shape,
            feature_len: numel,
            rows,
        })
    }

    /// Build a dataset from individually shaped samples.
    ///
    /// The first sample fixes the shape; every other sample must match it.
    ///
    /// # Errors
    /// `EmptyDataset` if `samples` is empty (the shape cannot be inferred),
    /// `ShapeMismatch` on the first disagreeing sample.
    pub fn from_samples(samples: Vec<Sample>) -> Result<Self> {
        let first = samples.first().ok_or(SvddError::EmptyDataset)?;
        let shape = first.shape.clone();
        let numel = checked_numel(&shape).ok_or_else(|| SvddError::ShapeMismatch {
            index: 0,
            expected: vec![],
            got: shape.clone(),
        })?;

        let mut rows = Vec::with_capacity(samples.len());
        for (index, sample) in samples.into_iter().enumerate() {
            if sample.shape != shape {
                return Err(SvddError::ShapeMismatch {
                    index,
                    expected: shape,
                    got: sample.shape,
                });
            }
            if sample.values.len() != numel {
                return Err(SvddError::ShapeMismatch {
                    index,
                    expected: vec![numel],
                    got: vec![sample.values.len()],
                });
            }
            rows.push(sample.values);
        }
        Self::new(shape, rows)
    }

    /// Load a JSON Lines file with one `{"shape": [...], "values": [...]}`
    /// object per line. Blank lines are skipped.
    pub fn from_jsonl(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);

        let mut samples = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            samples.push(serde_json::from_str::<Sample>(trimmed)?);
        }

        let dataset = Self::from_samples(samples)?;
        tracing::info!(
            path = %path.display(),
            samples = dataset.len(),
            shape = ?dataset.shape,
            "Loaded dataset"
        );
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Common sample shape.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Flattened length of one sample.
    pub fn feature_len(&self) -> usize {
        self.feature_len
    }

    /// All rows in dataset order.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.rows.iter().map(|r| r.as_slice())
    }

    /// Borrow the rows at `indices`, in that order.
    ///
    /// # Panics
    /// Panics if an index is out of bounds.
    pub fn gather(&self, indices: &[usize]) -> Vec<&[f32]> {
        indices.iter().map(|&i| self.rows[i].as_slice()).collect()
    }

    /// Check that samples fit a model expecting `input_dim` features.
    pub fn check_feature_len(&self, input_dim: usize) -> Result<()> {
        if self.feature_len() == input_dim {
            Ok(())
        } else {
            Err(SvddError::ShapeMismatch {
                index: 0,
                expected: vec![input_dim],
                got: self.shape.clone(),
            })
        }
    }
}

/// Shuffle `0..len` and slice the permutation into consecutive batches.
///
/// Every index appears exactly once across the returned batches. All batches
/// hold `batch_size` indices except possibly the last.
///
/// # Panics
/// Panics if `batch_size == 0`; the trainer validates this earlier.
pub fn epoch_batches(len: usize, batch_size: usize, rng: &mut impl Rng) -> Vec<Vec<usize>> {
    assert!(batch_size > 0, "batch_size must be > 0");
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(rng);
    order.chunks(batch_size).map(|c| c.to_vec()).collect()
}
