//! Configuration management for the fraud model pipeline

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the optional configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";

/// Prefix for environment overrides (`FRAUD_PIPELINE__TRAINING__MAX_ITER=500`)
pub const ENV_PREFIX: &str = "FRAUD_PIPELINE";

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub split: SplitConfig,
    pub training: TrainingConfig,
    pub logging: LoggingConfig,
}

/// Filesystem locations mounted by the processing host
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Raw labeled records read by the preprocessor
    pub raw_input: PathBuf,
    /// Train partition written by the preprocessor
    pub train_output: PathBuf,
    /// Test partition written by the preprocessor
    pub test_output: PathBuf,
    /// Packaged model read by the evaluator
    pub model_archive: PathBuf,
    /// Test partition read by the evaluator
    pub test_input: PathBuf,
    /// Evaluation report written by the evaluator
    pub evaluation_output: PathBuf,
    /// Directory the model archive is extracted into
    pub extract_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let base = Path::new("/opt/ml/processing");
        Self {
            raw_input: base.join("input").join("creditcard.csv"),
            train_output: base.join("train").join("train.csv"),
            test_output: base.join("test").join("test.csv"),
            model_archive: base.join("model").join("model.tar.gz"),
            test_input: base.join("test").join("test.csv"),
            evaluation_output: base.join("evaluation").join("evaluation.json"),
            extract_dir: PathBuf::from("."),
        }
    }
}

/// Train/test split configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of rows assigned to the test partition
    pub test_size: f64,
    /// Seed for the stratified shuffle
    pub random_state: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.3,
            random_state: 42,
        }
    }
}

/// Training hyperparameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Upper bound on optimizer iterations
    pub max_iter: usize,
    /// Neighbours considered when synthesizing minority samples
    pub k_neighbors: usize,
    /// Seed for oversampling
    pub random_state: u64,
    /// Inverse L2 regularization strength
    pub c: f64,
    /// Gradient tolerance for convergence
    pub tol: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            k_neighbors: 5,
            random_state: 42,
            c: 1.0,
            tol: 1e-4,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a specific path; a missing file falls back to defaults
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_env_prefix(path, ENV_PREFIX)
    }

    fn load_with_env_prefix<P: AsRef<Path>>(path: P, prefix: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix(prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
