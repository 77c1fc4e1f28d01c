//! Save and load a trained estimator.
//!
//! An artifact is a directory:
//!
//! ```text
//! <dir>/model.mpk   burn NamedMpk record of the embedder parameters
//! <dir>/svdd.json   {"R": <radius>, "c": [<center>...]}
//! ```
//!
//! Saving again into the same directory replaces both entries.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SvddError};
use crate::svdd::SvddState;

/// Model record stem; the recorder appends `.mpk`.
pub const MODEL_FILE: &str = "model";
/// State file holding the named `R` and `c` entries.
pub const STATE_FILE: &str = "svdd.json";

#[derive(Debug, Serialize, Deserialize)]
struct StateRecord {
    #[serde(rename = "R")]
    radius: f64,
    #[serde(rename = "c")]
    center: Vec<f32>,
}

/// Persist model parameters plus `R` and `c` under `destination`.
///
/// # Errors
/// `CenterNotInitialized` if the state has no center (nothing is written),
/// `Record`/`Io`/`Json` on write failures.
pub fn save<B: Backend, M: Module<B>>(model: &M, state: &SvddState, destination: &Path) -> Result<()> {
    let center = state.center()?;

    std::fs::create_dir_all(destination)?;
    let state_path = destination.join(STATE_FILE);
    if state_path.exists() {
        tracing::warn!(path = %destination.display(), "Overwriting existing artifact");
    }

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    model
        .clone()
        .save_file(destination.join(MODEL_FILE), &recorder)
        .map_err(|e| SvddError::Record(format!("failed to save model to {}: {e}", destination.display())))?;

    let record = StateRecord {
        radius: state.radius,
        center: center.to_vec(),
    };
    serde_json::to_writer_pretty(BufWriter::new(File::create(&state_path)?), &record)?;

    tracing::info!(
        path = %destination.display(),
        dim = record.center.len(),
        radius = record.radius,
        "Saved Deep SVDD artifact"
    );
    Ok(())
}

/// Load model parameters, center, and radius from `source`.
///
/// `model` is a freshly initialized module of the saved architecture.
/// Values are assigned as stored; nothing is re-estimated.
///
/// # Errors
/// `InvalidArtifact` for an empty center or a negative/non-finite radius,
/// `Record`/`Io`/`Json` on read failures.
pub fn load<B: Backend, M: Module<B>>(
    model: M,
    source: &Path,
    device: &B::Device,
) -> Result<(M, Vec<f32>, f64)> {
    let state_path = source.join(STATE_FILE);
    let record: StateRecord = serde_json::from_reader(BufReader::new(File::open(&state_path)?))?;

    if !(record.radius.is_finite() && record.radius >= 0.0) {
        return Err(SvddError::InvalidArtifact(format!(
            "radius must be finite and >= 0, got {}",
            record.radius
        )));
    }
    if record.center.is_empty() {
        return Err(SvddError::InvalidArtifact("center is empty".to_string()));
    }

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let model = model
        .load_file(source.join(MODEL_FILE), &recorder, device)
        .map_err(|e| SvddError::Record(format!("failed to load model from {}: {e}", source.display())))?;

    tracing::info!(
        path = %source.display(),
        dim = record.center.len(),
        radius = record.radius,
        "Loaded Deep SVDD artifact"
    );
    Ok((model, record.center, record.radius))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::embedder::LinearEmbedderConfig;
    use burn::backend::ndarray::NdArray;
    use tempfile::TempDir;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_save_without_center_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("artifact");
        let model = LinearEmbedderConfig::new(3, 2).init::<TestBackend>(&Default::default());

        let err = save(&model, &SvddState::default(), &dest).unwrap_err();
        assert!(matches!(err, SvddError::CenterNotInitialized));
        assert!(!dest.exists());
    }

    #[test]
    fn test_state_file_uses_named_entries() {
        let tmp = TempDir::new().unwrap();
        let model = LinearEmbedderConfig::new(3, 2).init::<TestBackend>(&Default::default());
        let state = SvddState {
            center: Some(vec![0.5, -0.25]),
            radius: 1.5,
        };
        save(&model, &state, tmp.path()).unwrap();

        let json: serde_json::Value =
            serde_json::from_reader(File::open(tmp.path().join(STATE_FILE)).unwrap()).unwrap();
        assert_eq!(json["R"], serde_json::json!(1.5));
        assert_eq!(json["c"], serde_json::json!([0.5, -0.25]));
    }

    #[test]
    fn test_save_overwrites() {
        let tmp = TempDir::new().unwrap();
        let device = Default::default();
        let model = LinearEmbedderConfig::new(3, 2).init::<TestBackend>(&device);

        let first = SvddState {
            center: Some(vec![1.0, 1.0]),
            radius: 2.0,
        };
        save(&model, &first, tmp.path()).unwrap();
        let second = SvddState {
            center: Some(vec![3.0, -3.0]),
            radius: 0.5,
        };
        save(&model, &second, tmp.path()).unwrap();

        let template = LinearEmbedderConfig::new(3, 2).init::<TestBackend>(&device);
        let (_, c, r) = load::<TestBackend, _>(template, tmp.path(), &device).unwrap();
        assert_eq!(c, vec![3.0, -3.0]);
        assert_eq!(r, 0.5);
    }

    #[test]
    fn test_load_rejects_negative_radius() {
        let tmp = TempDir::new().unwrap();
        let device = Default::default();
        let model = LinearEmbedderConfig::new(3, 2).init::<TestBackend>(&device);
        let state = SvddState {
            center: Some(vec![1.0, 1.0]),
            radius: 0.0,
        };
        save(&model, &state, tmp.path()).unwrap();
        std::fs::write(tmp.path().join(STATE_FILE), r#"{"R": -1.0, "c": [1.0, 1.0]}"#).unwrap();

        let err = load::<TestBackend, _>(model, tmp.path(), &device).unwrap_err();
        assert!(matches!(err, SvddError::InvalidArtifact(_)));
    }

    #[test]
    fn test_load_missing_artifact_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let device = Default::default();
        let model = LinearEmbedderConfig::new(3, 2).init::<TestBackend>(&device);
        let err = load::<TestBackend, _>(model, &tmp.path().join("missing"), &device).unwrap_err();
        assert!(matches!(err, SvddError::Io(_)));
    }
}
