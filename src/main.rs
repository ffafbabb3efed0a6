//! Fraud Model Pipeline - Main Entry Point
//!
//! Runs one pipeline stage per invocation. The processing host mounts data at
//! fixed paths, injects SM_* environment variables, and may append arguments
//! of its own, which are ignored.

use anyhow::{Context, Result};
use clap::Parser;
use fraud_model_pipeline::{
    cli::{self, Cli, Command},
    config::{AppConfig, LoggingConfig},
    models::loader::ModelLoader,
    Evaluator, InferenceEngine, Preprocessor, Trainer,
};
use std::io::Read;
use tracing::info;

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("fraud_model_pipeline={}", logging.level).parse()?);

    // stdout is reserved for scoring responses
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse_from(cli::retain_known_args(std::env::args()));

    let mut config = AppConfig::load_from_path(&cli.config)?;
    init_tracing(&config.logging)?;

    match cli.command {
        Command::Preprocess(args) => {
            info!("Starting preprocessing");
            let preprocessor = Preprocessor::new(config.split.clone());
            preprocessor.run(
                args.input.unwrap_or(config.paths.raw_input),
                args.train_output.unwrap_or(config.paths.train_output),
                args.test_output.unwrap_or(config.paths.test_output),
            )?;
        }
        Command::Train(args) => {
            info!("Starting training");
            let train_dir = args
                .train
                .context("Training data directory not set; pass --train or set SM_CHANNEL_TRAIN")?;
            let model_dir = args
                .model_dir
                .context("Model directory not set; pass --model-dir or set SM_MODEL_DIR")?;
            if let Some(max_iter) = args.max_iter {
                config.training.max_iter = max_iter;
            }

            let summary = Trainer::new(config.training.clone()).run(&train_dir, &model_dir)?;
            info!(
                iterations = summary.iterations,
                converged = summary.converged,
                "Training complete"
            );
        }
        Command::Package(args) => {
            let output = args.output.unwrap_or(config.paths.model_archive);
            ModelLoader::new().pack_archive(&args.model_dir, &output)?;
        }
        Command::Evaluate(args) => {
            info!("Starting evaluation");
            Evaluator::new().run(
                args.model_archive.unwrap_or(config.paths.model_archive),
                args.test.unwrap_or(config.paths.test_input),
                args.extract_dir.unwrap_or(config.paths.extract_dir),
                args.output.unwrap_or(config.paths.evaluation_output),
            )?;
        }
        Command::Score(args) => {
            let body = match args.body {
                Some(body) => body,
                None => {
                    let mut body = String::new();
                    std::io::stdin()
                        .read_to_string(&mut body)
                        .context("Failed to read request body from stdin")?;
                    body
                }
            };

            let engine = InferenceEngine::from_model_dir(&args.model_dir)?;
            let response = engine.score(&body, &args.content_type)?;
            info!(
                features = engine.model().n_features(),
                content_type = engine.response_content_type(),
                "Request scored"
            );
            println!("{}", response);
        }
    }

    Ok(())
}
