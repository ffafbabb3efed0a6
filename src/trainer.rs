//! Training stage: oversample, then fit the scaling + logistic pipeline.

use crate::config::TrainingConfig;
use crate::models::logistic::LogisticRegressionParams;
use crate::models::loader::ModelLoader;
use crate::models::pipeline::FittedPipeline;
use crate::resample::Smote;
use crate::types::dataset::Dataset;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// File name the trainer reads from its train channel
pub const TRAIN_FILE_NAME: &str = "train.csv";

/// Outcome of a training run
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    /// (rows, features) before oversampling
    pub original_shape: (usize, usize),
    /// (rows, features) after oversampling
    pub resampled_shape: (usize, usize),
    pub original_class_counts: [usize; 2],
    pub resampled_class_counts: [usize; 2],
    pub iterations: usize,
    pub converged: bool,
    pub model_path: Option<PathBuf>,
}

pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    fn smote(&self) -> Smote {
        Smote::new(self.config.k_neighbors, self.config.random_state)
    }

    fn classifier_params(&self) -> LogisticRegressionParams {
        LogisticRegressionParams {
            c: self.config.c,
            max_iter: self.config.max_iter,
            tol: self.config.tol,
        }
    }

    /// Rebalance the training set and fit a fresh pipeline on it.
    pub fn fit(&self, dataset: &Dataset) -> Result<(FittedPipeline, TrainingSummary)> {
        info!("Applying SMOTE resampling...");
        let (features, labels) = self
            .smote()
            .fit_resample(&dataset.features, &dataset.labels)?;
        let resampled = Dataset::new(dataset.feature_names.clone(), features, labels)?;

        info!(
            "Original shape: ({}, {}), Resampled shape: ({}, {})",
            dataset.n_rows(),
            dataset.n_features(),
            resampled.n_rows(),
            resampled.n_features()
        );

        info!(max_iter = self.config.max_iter, "Training pipeline");
        let pipeline = FittedPipeline::fit(&resampled, &self.classifier_params())?;

        let summary = TrainingSummary {
            original_shape: (dataset.n_rows(), dataset.n_features()),
            resampled_shape: (resampled.n_rows(), resampled.n_features()),
            original_class_counts: dataset.class_counts(),
            resampled_class_counts: resampled.class_counts(),
            iterations: pipeline.classifier.n_iter,
            converged: pipeline.classifier.converged,
            model_path: None,
        };

        Ok((pipeline, summary))
    }

    /// Read `<train_dir>/train.csv`, fit, and write `<model_dir>/model.joblib`.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(&self, train_dir: P, model_dir: Q) -> Result<TrainingSummary> {
        let train_file = train_dir.as_ref().join(TRAIN_FILE_NAME);
        info!(path = %train_file.display(), "Reading training data");
        let dataset = Dataset::read_csv(&train_file)
            .with_context(|| format!("Failed to load training data from {}", train_file.display()))?;

        let (pipeline, mut summary) = self.fit(&dataset)?;

        let model_path = ModelLoader::new().artifact_path(model_dir);
        pipeline.save(&model_path)?;
        info!(path = %model_path.display(), "Model saved");

        summary.model_path = Some(model_path);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn imbalanced_dataset() -> Dataset {
        // 16 legitimate rows around the origin, 4 fraudulent rows far away
        let mut values = Vec::new();
        let mut labels = Vec::new();
        for i in 0..16 {
            let t = i as f64 / 16.0;
            values.extend([t - 0.5, 0.3 - t, 10.0 + t]);
            labels.push(0u8);
        }
        for i in 0..4 {
            let t = i as f64 / 4.0;
            values.extend([3.0 + t, 2.5 - t, 400.0 + 20.0 * t]);
            labels.push(1u8);
        }

        Dataset::new(
            vec!["V1".to_string(), "V2".to_string(), "Amount".to_string()],
            Array2::from_shape_vec((20, 3), values).unwrap(),
            Array1::from(labels),
        )
        .unwrap()
    }

    #[test]
    fn test_fit_oversamples_minority() {
        let trainer = Trainer::new(TrainingConfig::default());
        let dataset = imbalanced_dataset();

        let (pipeline, summary) = trainer.fit(&dataset).unwrap();

        assert_eq!(summary.original_class_counts, [16, 4]);
        assert_eq!(summary.resampled_class_counts, [16, 16]);
        assert!(summary.resampled_class_counts[1] > summary.original_class_counts[1]);
        assert_eq!(summary.resampled_shape, (32, 3));
        assert!(summary.converged);
        assert_eq!(pipeline.predict(&dataset.features).unwrap(), dataset.labels);
    }

    #[test]
    fn test_run_writes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let train_dir = dir.path().join("train");
        let model_dir = dir.path().join("model");
        imbalanced_dataset()
            .write_csv(train_dir.join(TRAIN_FILE_NAME))
            .unwrap();

        let summary = Trainer::new(TrainingConfig::default())
            .run(&train_dir, &model_dir)
            .unwrap();

        let model_path = summary.model_path.unwrap();
        assert_eq!(model_path, model_dir.join("model.joblib"));

        let loaded = ModelLoader::new().load_model(&model_dir).unwrap();
        assert_eq!(loaded.feature_names, vec!["V1", "V2", "Amount"]);
    }

    #[test]
    fn test_missing_train_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Trainer::new(TrainingConfig::default()).run(dir.path(), dir.path());
        assert!(result.is_err());
    }
}
