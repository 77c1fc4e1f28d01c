//! Tensor bridge: conversions between flattened `Vec<f32>` samples and
//! burn tensors.
//!
//! Datasets, centers, and scores live outside burn as plain vectors; the
//! embedder consumes and produces `Tensor<B, 2>`.

use burn::prelude::*;
use burn::tensor::TensorData;

use crate::error::{Result, SvddError};

/// Stack flattened rows into a `(rows, dim)` tensor.
///
/// # Panics
/// Panics if `rows` is empty or the rows have inconsistent lengths. Callers
/// validate shapes before reaching this point.
pub fn rows_to_tensor<B: Backend>(rows: &[&[f32]], device: &B::Device) -> Tensor<B, 2> {
    assert!(!rows.is_empty(), "rows must not be empty");
    let dim = rows[0].len();
    assert!(dim > 0, "row length must be > 0");
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.len(), dim, "row {i} has length {}, expected {dim}", row.len());
    }

    let flat: Vec<f32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
    Tensor::from_data(TensorData::new(flat, [rows.len(), dim]), device)
}

/// Convert a center vector to a 1D tensor of shape `(d,)`.
pub fn vector_to_tensor<B: Backend>(values: &[f32], device: &B::Device) -> Tensor<B, 1> {
    Tensor::from_data(TensorData::new(values.to_vec(), [values.len()]), device)
}

/// Extract f64 values from a burn 1D tensor.
pub fn tensor_to_vec<B: Backend>(tensor: Tensor<B, 1>) -> Result<Vec<f64>> {
    let [len] = tensor.dims();
    let values = data_to_f32(tensor.into_data().convert::<f32>(), len)?;
    Ok(values.into_iter().map(|v| v as f64).collect())
}

/// Split a `(rows, dim)` tensor back into one `Vec<f32>` per row.
pub fn tensor_to_rows<B: Backend>(tensor: Tensor<B, 2>) -> Result<Vec<Vec<f32>>> {
    let [rows, dim] = tensor.dims();
    let flat = data_to_f32(tensor.into_data().convert::<f32>(), rows * dim)?;
    if dim == 0 {
        return Ok(Vec::new());
    }
    Ok(flat.chunks(dim).map(|c| c.to_vec()).collect())
}

/// Read `expected` f32 values out of `data`.
fn data_to_f32(data: TensorData, expected: usize) -> Result<Vec<f32>> {
    let values = data
        .to_vec::<f32>()
        .map_err(|e| SvddError::TensorData(format!("{e:?}")))?;
    if values.len() != expected {
        return Err(SvddError::TensorData(format!(
            "expected {expected} values, got {}",
            values.len()
        )));
    }
    Ok(values)
}

/// Extract a single f64 scalar from a burn tensor with one element.
pub fn tensor_to_f64<B: Backend>(tensor: Tensor<B, 1>) -> f64 {
    let val: f32 = tensor.into_scalar().elem();
    val as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_rows_round_trip() {
        let device = Default::default();
        let a = [1.0_f32, 2.0, 3.0];
        let b = [4.0_f32, 5.0, 6.0];
        let tensor = rows_to_tensor::<TestBackend>(&[&a, &b], &device);
        assert_eq!(tensor.dims(), [2, 3]);

        let rows = tensor_to_rows(tensor).unwrap();
        assert_eq!(rows, vec![a.to_vec(), b.to_vec()]);
    }

    #[test]
    #[should_panic(expected = "row 1 has length 2")]
    fn test_rows_inconsistent_length_panics() {
        let device = Default::default();
        let a = [1.0_f32, 2.0, 3.0];
        let b = [4.0_f32, 5.0];
        let _ = rows_to_tensor::<TestBackend>(&[&a, &b], &device);
    }

    #[test]
    fn test_vector_and_scalar_extraction() {
        let device = Default::default();
        let tensor = vector_to_tensor::<TestBackend>(&[1.0, 2.5, -3.0], &device);
        let values = tensor_to_vec(tensor).unwrap();
        assert_eq!(values, vec![1.0, 2.5, -3.0]);

        let scalar = vector_to_tensor::<TestBackend>(&[42.0], &device);
        assert!((tensor_to_f64(scalar) - 42.0).abs() < 1e-6);
    }

    #[test]
    fn test_mistyped_data_is_an_error() {
        let data = TensorData::new(vec![1_i64, 2, 3], [3]);
        assert!(matches!(
            data_to_f32(data, 3),
            Err(SvddError::TensorData(_))
        ));
    }

    #[test]
    fn test_short_data_is_an_error() {
        let data = TensorData::new(vec![1.0_f32, 2.0], [2]);
        let err = data_to_f32(data, 3).unwrap_err();
        assert!(err.to_string().contains("expected 3 values, got 2"));
    }
}
