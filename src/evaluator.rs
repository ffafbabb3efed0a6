//! Evaluation stage: score the held-out partition and emit the metrics report.

use crate::metrics::{ClassificationMetrics, ConfusionMatrix};
use crate::models::loader::ModelLoader;
use crate::models::pipeline::FittedPipeline;
use crate::types::dataset::Dataset;
use crate::types::report::EvaluationReport;
use anyhow::Result;
use std::path::Path;
use tracing::info;

/// Computes classification metrics for a packaged pipeline
#[derive(Default)]
pub struct Evaluator {
    loader: ModelLoader,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Predict hard labels for every test record and score them.
    pub fn evaluate(&self, pipeline: &FittedPipeline, test: &Dataset) -> Result<ClassificationMetrics> {
        info!(rows = test.n_rows(), "Generating predictions...");
        let predictions = pipeline.predict(&test.features)?;

        info!("Calculating metrics...");
        let y_true = test.labels.to_vec();
        let y_pred = predictions.to_vec();
        let metrics = ClassificationMetrics::from_predictions(&y_true, &y_pred)?;

        info!(precision = metrics.precision, "Precision");
        info!(recall = metrics.recall, "Recall");
        info!(f1 = metrics.f1, "F1 Score");
        metrics.log_summary(&ConfusionMatrix::from_labels(&y_true, &y_pred)?);

        Ok(metrics)
    }

    /// Unpack the model archive into `extract_dir`, evaluate on `test_csv`, write the report.
    pub fn run<A, T, E, O>(&self, model_archive: A, test_csv: T, extract_dir: E, output: O) -> Result<EvaluationReport>
    where
        A: AsRef<Path>,
        T: AsRef<Path>,
        E: AsRef<Path>,
        O: AsRef<Path>,
    {
        let test_csv = test_csv.as_ref();
        info!(path = %test_csv.display(), "Reading test data");
        let test = Dataset::read_csv(test_csv)?;

        let pipeline = self.loader.load_from_archive(model_archive, extract_dir)?;

        let metrics = self.evaluate(&pipeline, &test)?;
        let report = EvaluationReport::from(&metrics);

        let output = output.as_ref();
        info!(path = %output.display(), "Saving evaluation report");
        report.write(output)?;

        info!("Evaluation complete");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::logistic::{LogisticRegression, LogisticRegressionParams};
    use crate::models::scaler::StandardScaler;
    use ndarray::array;

    /// Identity scaling and a threshold at V1 = 0
    fn threshold_pipeline() -> FittedPipeline {
        FittedPipeline {
            feature_names: vec!["V1".to_string()],
            scaler: StandardScaler {
                mean: array![0.0],
                scale: array![1.0],
            },
            classifier: LogisticRegression {
                coef: array![1.0],
                intercept: 0.0,
                n_iter: 0,
                converged: true,
            },
        }
    }

    #[test]
    fn test_evaluate_known_predictions() {
        // Predictions: 1,1,1,0,0 for positives; 1,0,0,0,0 for negatives
        let test = Dataset::new(
            vec!["V1".to_string()],
            array![[1.0], [2.0], [0.5], [-1.0], [-0.5], [0.7], [-2.0], [-1.0], [-0.1], [-3.0]],
            array![1, 1, 1, 1, 1, 0, 0, 0, 0, 0],
        )
        .unwrap();

        let metrics = Evaluator::new().evaluate(&threshold_pipeline(), &test).unwrap();

        assert_eq!(metrics.precision, 0.75);
        assert_eq!(metrics.recall, 0.6);
        assert_eq!(metrics.accuracy, 0.7);
        assert!((metrics.f1 - 2.0 / 3.0).abs() < 1e-12);
        assert!((metrics.auc - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_run_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ModelLoader::new();

        let train = Dataset::new(
            vec!["V1".to_string()],
            array![[-2.0], [-1.0], [-1.5], [1.0], [2.0], [1.5]],
            array![0, 0, 0, 1, 1, 1],
        )
        .unwrap();
        let pipeline = FittedPipeline::fit(&train, &LogisticRegressionParams::default()).unwrap();
        let model_dir = dir.path().join("model");
        pipeline.save(loader.artifact_path(&model_dir)).unwrap();
        let archive = loader
            .pack_archive(&model_dir, dir.path().join("model.tar.gz"))
            .unwrap();

        let test_csv = dir.path().join("test").join("test.csv");
        train.write_csv(&test_csv).unwrap();

        let output = dir.path().join("evaluation").join("evaluation.json");
        let report = Evaluator::new()
            .run(&archive, &test_csv, dir.path().join("work"), &output)
            .unwrap();

        let metrics = &report.binary_classification_metrics;
        assert_eq!(metrics.accuracy.value, 1.0);
        assert_eq!(metrics.auc.value, 1.0);
        assert_eq!(metrics.recall.standard_deviation, "NaN");

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["binary_classification_metrics"]["f1"]["value"], 1.0);
        assert_eq!(
            written["binary_classification_metrics"]["auc"]["standard_deviation"],
            "NaN"
        );
    }
}
