mod config;
mod pipeline;
pub mod results;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use svdd::Objective;
use tracing_subscriber::EnvFilter;

use config::TrainOverrides;
use pipeline::{DetectArgs, ScoreArgs, TrainArgs};

/// deep-svdd: one-class anomaly detection with Deep SVDD.
#[derive(Parser)]
#[command(name = "deep-svdd", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands for training, scoring, and thresholded detection.
#[derive(Subcommand)]
enum Command {
    /// Train on normal samples and write a model artifact.
    Train {
        /// Path to svdd config TOML file.
        #[arg(long, default_value = "configs/svdd.toml")]
        config: PathBuf,
        /// JSONL file of normal samples ({"shape": [...], "values": [...]} per line).
        #[arg(long)]
        data: PathBuf,
        /// Artifact directory (model.mpk + svdd.json + train_report.json).
        #[arg(long)]
        output: PathBuf,
        /// Override the objective ("one-class" or "soft-boundary").
        #[arg(long)]
        objective: Option<Objective>,
        /// Override nu, strictly inside (0, 1).
        #[arg(long)]
        nu: Option<f64>,
        /// Override the batch size.
        #[arg(long)]
        batch_size: Option<usize>,
        /// Override the learning rate.
        #[arg(long)]
        lr: Option<f64>,
        /// Override the number of epochs.
        #[arg(long)]
        epochs: Option<usize>,
        /// Override the shuffle seed.
        #[arg(long)]
        seed: Option<u64>,
        /// Show a per-epoch progress bar.
        #[arg(long)]
        verbose: bool,
    },
    /// Compute anomaly scores with a trained artifact.
    Score {
        /// Path to svdd config TOML file (the [model] section must match training).
        #[arg(long, default_value = "configs/svdd.toml")]
        config: PathBuf,
        /// Artifact directory written by `train`.
        #[arg(long)]
        model: PathBuf,
        /// JSONL file of samples to score.
        #[arg(long)]
        data: PathBuf,
        /// Path to write JSON scores.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Forward-pass chunk size.
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Score and flag samples whose score reaches the threshold.
    Detect {
        /// Path to svdd config TOML file.
        #[arg(long, default_value = "configs/svdd.toml")]
        config: PathBuf,
        /// Artifact directory written by `train`.
        #[arg(long)]
        model: PathBuf,
        /// JSONL file of samples to classify.
        #[arg(long)]
        data: PathBuf,
        /// Override the [detect] threshold.
        #[arg(long)]
        threshold: Option<f64>,
        /// Path to write the JSON detection report.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Forward-pass chunk size.
        #[arg(long)]
        batch_size: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Train {
            config,
            data,
            output,
            objective,
            nu,
            batch_size,
            lr,
            epochs,
            seed,
            verbose,
        } => pipeline::run_train(TrainArgs {
            config,
            data,
            output,
            overrides: TrainOverrides {
                objective,
                nu,
                batch_size,
                lr,
                epochs,
                seed,
                verbose,
            },
        }),
        Command::Score {
            config,
            model,
            data,
            output,
            batch_size,
        } => pipeline::run_score(ScoreArgs {
            config,
            model,
            data,
            output,
            batch_size,
        }),
        Command::Detect {
            config,
            model,
            data,
            threshold,
            output,
            batch_size,
        } => pipeline::run_detect(DetectArgs {
            config,
            model,
            data,
            threshold,
            output,
            batch_size,
        }),
    }
}
