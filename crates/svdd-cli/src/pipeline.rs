//! Train, score, and detect pipelines behind the CLI subcommands.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use burn::backend::ndarray::{NdArray, NdArrayDevice};
use burn::backend::Autodiff;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use svdd::{Dataset, DeepSvdd, Detector, MlpEmbedder, SvddScorer};

use crate::config::{build_training_config, load_svdd_toml, ModelSection, TrainOverrides};
use crate::results::{DetectionReport, ScoreReport, ScoreSummary, TrainReport};

type InferenceBackend = NdArray<f32>;
type TrainBackend = Autodiff<InferenceBackend>;

/// File written next to the artifact by `train`.
const TRAIN_REPORT_FILE: &str = "train_report.json";

/// Arguments for the `train` subcommand.
#[derive(Debug)]
pub struct TrainArgs {
    /// Path to the svdd config TOML file.
    pub config: PathBuf,
    /// JSONL dataset of normal samples.
    pub data: PathBuf,
    /// Artifact directory to write.
    pub output: PathBuf,
    pub overrides: TrainOverrides,
}

/// Arguments for the `score` subcommand.
#[derive(Debug)]
pub struct ScoreArgs {
    pub config: PathBuf,
    /// Artifact directory written by `train`.
    pub model: PathBuf,
    pub data: PathBuf,
    /// JSON output path; summary is printed either way.
    pub output: Option<PathBuf>,
    pub batch_size: Option<usize>,
}

/// Arguments for the `detect` subcommand.
#[derive(Debug)]
pub struct DetectArgs {
    pub config: PathBuf,
    pub model: PathBuf,
    pub data: PathBuf,
    /// Overrides `[detect] threshold`.
    pub threshold: Option<f64>,
    pub output: Option<PathBuf>,
    pub batch_size: Option<usize>,
}

/// Train a Deep SVDD model on normal data and save the artifact.
pub fn run_train(args: TrainArgs) -> anyhow::Result<()> {
    let start = Instant::now();

    // 1. Load config
    let toml = load_svdd_toml(&args.config)?;
    let train_config = build_training_config(&toml.train, &args.overrides)?;

    // 2. Load data
    let dataset = Dataset::from_jsonl(&args.data)
        .with_context(|| format!("failed to load dataset {}", args.data.display()))?;
    ensure_shape(&dataset, &toml.model)?;

    // 3. Build model
    let device = NdArrayDevice::Cpu;
    let model = toml.model.embedder_config()?.init::<TrainBackend>(&device);
    let mut estimator = DeepSvdd::new(model, toml.model.representation_dim, device)?;

    // 4. Fit
    let mut rng = match train_config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let report = estimator.fit(&dataset, &train_config, &mut rng)?;
    if !report.is_finite() {
        tracing::warn!("Training produced non-finite loss or radius");
    }

    // 5. Save artifact and report
    estimator.save(&args.output)?;
    let train_report = TrainReport::from_fit(
        train_config.objective.to_string(),
        dataset.len(),
        estimator.radius(),
        &report,
    );
    write_json(&args.output.join(TRAIN_REPORT_FILE), &train_report)?;

    println!("\n--- Training Summary ---");
    println!("Samples: {}", dataset.len());
    println!("Objective: {}", train_config.objective);
    println!("Epochs: {}", report.epochs.len());
    if let Some(loss) = report.final_loss() {
        println!("Final loss: {loss:.6}");
    }
    println!("Radius: {:.6}", estimator.radius());
    println!("Output: {}", args.output.display());
    println!("Elapsed: {:.1}s", start.elapsed().as_secs_f64());

    Ok(())
}

/// Score a dataset with a saved artifact.
pub fn run_score(args: ScoreArgs) -> anyhow::Result<()> {
    let toml = load_svdd_toml(&args.config)?;
    let scorer = load_scorer(&toml.model, &args.model, args.batch_size)?;
    let dataset = Dataset::from_jsonl(&args.data)
        .with_context(|| format!("failed to load dataset {}", args.data.display()))?;
    ensure_shape(&dataset, &toml.model)?;

    let scores = scorer.score(&dataset)?;
    let summary = ScoreSummary::from_scores(&scores);

    println!("--- Score Summary ---");
    println!("Samples: {}", summary.count);
    println!("Min: {:.6}", summary.min);
    println!("Median: {:.6}", summary.median);
    println!("Mean: {:.6}", summary.mean);
    println!("P95: {:.6}", summary.p95);
    println!("Max: {:.6}", summary.max);

    if let Some(output) = &args.output {
        let report = ScoreReport {
            model: args.model.display().to_string(),
            data: args.data.display().to_string(),
            summary,
            scores,
        };
        write_json(output, &report)?;
        println!("Output: {}", output.display());
    }

    Ok(())
}

/// Score and threshold a dataset with a saved artifact.
pub fn run_detect(args: DetectArgs) -> anyhow::Result<()> {
    let toml = load_svdd_toml(&args.config)?;
    let threshold = args.threshold.unwrap_or(toml.detect.threshold);
    let scorer = load_scorer(&toml.model, &args.model, args.batch_size)?;
    let detector = Detector::new(scorer, threshold);
    let dataset = Dataset::from_jsonl(&args.data)
        .with_context(|| format!("failed to load dataset {}", args.data.display()))?;
    ensure_shape(&dataset, &toml.model)?;

    let detections = detector.detect(&dataset)?;
    let report = DetectionReport::new(
        args.model.display().to_string(),
        args.data.display().to_string(),
        threshold,
        detections,
    );

    println!("--- Detection Summary ---");
    println!("Threshold: {threshold}");
    println!("Anomalies: {}/{}", report.anomalies, report.total);
    println!("Anomaly rate: {:.1}%", report.anomaly_rate * 100.0);

    if let Some(output) = &args.output {
        write_json(output, &report)?;
        println!("Output: {}", output.display());
    }

    Ok(())
}

/// Reject data whose sample shape differs from `[model] input_shape`.
///
/// The embedder only sees flattened rows, so a transposed shape with the
/// same element count would otherwise pass silently.
fn ensure_shape(dataset: &Dataset, model: &ModelSection) -> anyhow::Result<()> {
    if dataset.shape() != model.input_shape.as_slice() {
        anyhow::bail!(
            "dataset shape {:?} does not match [model] input_shape {:?}",
            dataset.shape(),
            model.input_shape
        );
    }
    Ok(())
}

fn load_scorer(
    model: &ModelSection,
    artifact: &Path,
    batch_size: Option<usize>,
) -> anyhow::Result<SvddScorer<InferenceBackend, MlpEmbedder<InferenceBackend>>> {
    let device = NdArrayDevice::Cpu;
    let template = model.embedder_config()?.init::<InferenceBackend>(&device);
    let scorer = SvddScorer::<InferenceBackend, _>::load(template, artifact, device)
        .with_context(|| format!("failed to load artifact {}", artifact.display()))?;
    Ok(match batch_size {
        Some(n) => scorer.with_batch_size(n),
        None => scorer,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_section(input_shape: Vec<usize>) -> ModelSection {
        ModelSection {
            input_shape,
            ..ModelSection::default()
        }
    }

    #[test]
    fn test_ensure_shape() {
        let dataset = Dataset::new(vec![3, 2], vec![vec![0.0; 6]]).unwrap();
        assert!(ensure_shape(&dataset, &model_section(vec![3, 2])).is_ok());

        // Same element count, different layout.
        let err = ensure_shape(&dataset, &model_section(vec![2, 3])).unwrap_err();
        assert!(err.to_string().contains("input_shape [2, 3]"), "{err}");
    }
}
