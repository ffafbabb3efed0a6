//! Fitted scaling + classification pipeline and its on-disk artifact

use crate::models::logistic::{LogisticRegression, LogisticRegressionParams};
use crate::models::scaler::StandardScaler;
use crate::types::dataset::Dataset;
use anyhow::{bail, Context, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// File name of the serialized pipeline inside a model directory
pub const MODEL_FILE_NAME: &str = "model.joblib";

/// Scaler followed by a logistic classifier, both fitted on the same data.
///
/// Immutable once fitted; every training run produces a new artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    /// Feature columns seen during fit, in order
    pub feature_names: Vec<String>,
    pub scaler: StandardScaler,
    pub classifier: LogisticRegression,
}

impl FittedPipeline {
    /// Fit the scaler, then the classifier on the scaled features.
    pub fn fit(dataset: &Dataset, params: &LogisticRegressionParams) -> Result<Self> {
        let scaler = StandardScaler::fit(&dataset.features)?;
        let scaled = scaler.transform(&dataset.features)?;
        let classifier = LogisticRegression::fit(&scaled, &dataset.labels, params)?;

        Ok(Self {
            feature_names: dataset.feature_names.clone(),
            scaler,
            classifier,
        })
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.n_features() {
            bail!(
                "X has {} features, but the pipeline is expecting {} features as input",
                x.ncols(),
                self.n_features()
            );
        }
        Ok(())
    }

    /// Hard labels (0/1) per row.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<u8>> {
        self.check_width(x)?;
        Ok(self.classifier.predict(&self.scaler.transform(x)?))
    }

    /// Class-membership probabilities, one `[p0, p1]` row per input row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(x)?;
        Ok(self.classifier.predict_proba(&self.scaler.transform(x)?))
    }

    /// Persist as a single opaque artifact.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)
            .with_context(|| format!("Failed to serialize pipeline to {}", path.display()))?;
        writer.flush()?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let pipeline: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to deserialize pipeline from {}", path.display()))?;

        if pipeline.scaler.n_features() != pipeline.n_features()
            || pipeline.classifier.n_features() != pipeline.n_features()
        {
            bail!("Corrupt pipeline artifact {}: inconsistent feature counts", path.display());
        }
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn toy_dataset() -> Dataset {
        Dataset::new(
            vec!["V1".to_string(), "Amount".to_string()],
            array![
                [-2.0, 10.0],
                [-1.0, 12.0],
                [-1.5, 9.0],
                [1.0, 300.0],
                [2.0, 250.0],
                [1.5, 280.0]
            ],
            array![0, 0, 0, 1, 1, 1],
        )
        .unwrap()
    }

    #[test]
    fn test_fit_predict() {
        let dataset = toy_dataset();
        let pipeline = FittedPipeline::fit(&dataset, &LogisticRegressionParams::default()).unwrap();

        assert_eq!(pipeline.predict(&dataset.features).unwrap(), dataset.labels);
        let proba = pipeline.predict_proba(&array![[1.8, 270.0]]).unwrap();
        assert_eq!(proba.shape(), &[1, 2]);
        assert!(proba[[0, 1]] > 0.5);
    }

    #[test]
    fn test_wrong_width_is_rejected() {
        let pipeline = FittedPipeline::fit(&toy_dataset(), &LogisticRegressionParams::default()).unwrap();
        assert!(pipeline.predict(&array![[1.0, 2.0, 3.0]]).is_err());
    }

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model").join(MODEL_FILE_NAME);

        let pipeline = FittedPipeline::fit(&toy_dataset(), &LogisticRegressionParams::default()).unwrap();
        pipeline.save(&path).unwrap();

        let loaded = FittedPipeline::load(&path).unwrap();
        assert_eq!(
            loaded.predict(&toy_dataset().features).unwrap(),
            pipeline.predict(&toy_dataset().features).unwrap()
        );
    }

    #[test]
    fn test_load_corrupt_artifact_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MODEL_FILE_NAME);
        std::fs::write(&path, b"not a pipeline").unwrap();
        assert!(FittedPipeline::load(&path).is_err());
    }
}
