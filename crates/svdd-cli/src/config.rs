//! TOML config loading for the deep-svdd CLI.
//!
//! Deserializes `configs/svdd.toml` which has `[model]`, `[train]`, and
//! `[detect]` sections, then merges with CLI overrides.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use svdd::{MlpEmbedderConfig, Objective, SvddTrainingConfig};

/// Top-level structure matching `configs/svdd.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct SvddToml {
    /// Embedder architecture.
    #[serde(default)]
    pub model: ModelSection,
    /// Training hyperparameters.
    #[serde(default)]
    pub train: TrainSection,
    /// Decision threshold.
    #[serde(default)]
    pub detect: DetectSection,
}

#[derive(Debug, Deserialize)]
pub struct ModelSection {
    /// Per-sample shape; flattened to the embedder input width.
    #[serde(default = "default_input_shape")]
    pub input_shape: Vec<usize>,
    #[serde(default = "default_hidden_dim")]
    pub hidden_dim: usize,
    #[serde(default = "default_representation_dim")]
    pub representation_dim: usize,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            input_shape: default_input_shape(),
            hidden_dim: default_hidden_dim(),
            representation_dim: default_representation_dim(),
        }
    }
}

impl ModelSection {
    /// Flattened input width; rejects an overflowing `input_shape`.
    pub fn input_dim(&self) -> anyhow::Result<usize> {
        self.input_shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .with_context(|| format!("input_shape {:?} overflows usize", self.input_shape))
    }

    pub fn embedder_config(&self) -> anyhow::Result<MlpEmbedderConfig> {
        Ok(MlpEmbedderConfig::new(self.input_dim()?)
            .with_d_hidden(self.hidden_dim)
            .with_representation_dim(self.representation_dim))
    }
}

#[derive(Debug, Deserialize)]
pub struct TrainSection {
    #[serde(default)]
    pub objective: Objective,
    #[serde(default = "default_nu")]
    pub nu: f64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_lr")]
    pub lr: f64,
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    /// Center collapse-guard magnitude.
    #[serde(default = "default_eps")]
    pub eps: f64,
    /// Shuffle seed; entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl Default for TrainSection {
    fn default() -> Self {
        Self {
            objective: Objective::default(),
            nu: default_nu(),
            batch_size: default_batch_size(),
            lr: default_lr(),
            epochs: default_epochs(),
            eps: default_eps(),
            seed: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DetectSection {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for DetectSection {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

fn default_input_shape() -> Vec<usize> {
    vec![32, 32, 3]
}

fn default_hidden_dim() -> usize {
    128
}

fn default_representation_dim() -> usize {
    32
}

fn default_nu() -> f64 {
    0.1
}

fn default_batch_size() -> usize {
    128
}

fn default_lr() -> f64 {
    1e-3
}

fn default_epochs() -> usize {
    10
}

fn default_eps() -> f64 {
    svdd::center::DEFAULT_CENTER_EPS
}

fn default_threshold() -> f64 {
    0.5
}

/// Load and deserialize an `SvddToml` from a TOML file.
pub fn load_svdd_toml(path: &Path) -> anyhow::Result<SvddToml> {
    let contents = std::fs::read_to_string(path)?;
    let config: SvddToml = toml::from_str(&contents)?;
    tracing::info!(path = %path.display(), "Loaded svdd config");
    Ok(config)
}

/// CLI flags that override `[train]` values.
#[derive(Debug, Default, Clone)]
pub struct TrainOverrides {
    pub objective: Option<Objective>,
    pub nu: Option<f64>,
    pub batch_size: Option<usize>,
    pub lr: Option<f64>,
    pub epochs: Option<usize>,
    pub seed: Option<u64>,
    pub verbose: bool,
}

/// Build an `SvddTrainingConfig` from TOML values and CLI flags.
///
/// Priority chain: built-in defaults < TOML values < CLI flags. The result is
/// validated before it is returned.
pub fn build_training_config(
    section: &TrainSection,
    overrides: &TrainOverrides,
) -> anyhow::Result<SvddTrainingConfig> {
    let config = SvddTrainingConfig::new()
        .with_objective(overrides.objective.unwrap_or(section.objective))
        .with_nu(overrides.nu.unwrap_or(section.nu))
        .with_batch_size(overrides.batch_size.unwrap_or(section.batch_size))
        .with_lr(overrides.lr.unwrap_or(section.lr))
        .with_epochs(overrides.epochs.unwrap_or(section.epochs))
        .with_center_eps(section.eps)
        .with_seed(overrides.seed.or(section.seed))
        .with_verbose(overrides.verbose);
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_svdd_toml() {
        let toml_str = r#"
[model]
input_shape = [28, 28, 1]
hidden_dim = 64
representation_dim = 16

[train]
objective = "soft-boundary"
nu = 0.05
batch_size = 200
lr = 1e-4
epochs = 150
eps = 0.01
seed = 7

[detect]
threshold = 1.25
"#;
        let config: SvddToml = toml::from_str(toml_str).unwrap();
        assert_eq!(config.model.input_dim().unwrap(), 784);
        assert_eq!(config.model.hidden_dim, 64);
        assert_eq!(config.model.representation_dim, 16);
        assert_eq!(config.train.objective, Objective::SoftBoundary);
        assert!((config.train.nu - 0.05).abs() < 1e-12);
        assert_eq!(config.train.batch_size, 200);
        assert_eq!(config.train.epochs, 150);
        assert!((config.train.eps - 0.01).abs() < 1e-12);
        assert_eq!(config.train.seed, Some(7));
        assert!((config.detect.threshold - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: SvddToml = toml::from_str("").unwrap();
        assert_eq!(config.model.input_shape, vec![32, 32, 3]);
        assert_eq!(config.model.input_dim().unwrap(), 3072);
        assert_eq!(config.train.objective, Objective::OneClass);
        assert_eq!(config.train.batch_size, 128);
        assert!(config.train.seed.is_none());
        assert!((config.detect.threshold - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_overflowing_input_shape_rejected() {
        let config: SvddToml = toml::from_str(
            r#"
[model]
input_shape = [4294967296, 4294967296]
"#,
        )
        .unwrap();
        assert!(config.model.input_dim().is_err());
        assert!(config.model.embedder_config().is_err());
    }

    #[test]
    fn test_unknown_objective_fails_to_parse() {
        let toml_str = r#"
[train]
objective = "hinge"
"#;
        assert!(toml::from_str::<SvddToml>(toml_str).is_err());
    }

    #[test]
    fn test_cli_override_priority() {
        let section = TrainSection {
            nu: 0.2,
            epochs: 50,
            seed: Some(1),
            ..Default::default()
        };
        let overrides = TrainOverrides {
            epochs: Some(3),
            seed: Some(99),
            ..Default::default()
        };

        let config = build_training_config(&section, &overrides).unwrap();
        assert_eq!(config.epochs, 3, "CLI wins over TOML");
        assert_eq!(config.seed, Some(99));
        assert!((config.nu - 0.2).abs() < 1e-12, "TOML wins over default");
        assert_eq!(config.batch_size, 128);
    }

    #[test]
    fn test_build_rejects_invalid_values() {
        let section = TrainSection::default();
        let overrides = TrainOverrides {
            batch_size: Some(0),
            ..Default::default()
        };
        assert!(build_training_config(&section, &overrides).is_err());

        let bad_nu = TrainSection {
            nu: 1.0,
            ..Default::default()
        };
        assert!(build_training_config(&bad_nu, &TrainOverrides::default()).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[train]\nepochs = 4\n").unwrap();
        let config = load_svdd_toml(tmp.path()).unwrap();
        assert_eq!(config.train.epochs, 4);
    }
}
