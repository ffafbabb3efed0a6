//! Single-record fraud scoring callbacks for a request-serving host

use crate::feature_extractor::FeatureExtractor;
use crate::models::loader::ModelLoader;
use crate::models::pipeline::FittedPipeline;
use crate::types::score::FraudScore;
use anyhow::{bail, Context, Result};
use ndarray::Array2;
use std::path::Path;
use tracing::debug;

/// The only request content type understood by the decoder
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Content type of encoded responses
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// The four callbacks a serving host composes per request.
///
/// Implementations hold no per-request state; a loaded model is shared
/// read-only between calls.
pub trait InferenceHandler {
    type Model;
    type Input;
    type Output;

    /// Locate and deserialize the model inside `model_dir`.
    fn load(&self, model_dir: &Path) -> Result<Self::Model>;

    /// Turn a raw request body into model input.
    fn decode(&self, body: &str, content_type: &str) -> Result<Self::Input>;

    fn predict(&self, input: &Self::Input, model: &Self::Model) -> Result<Self::Output>;

    /// Serialize a prediction into a response body.
    fn encode(&self, prediction: &Self::Output) -> Result<String>;

    /// Content type of bodies produced by `encode`.
    fn response_content_type(&self) -> &str;

    /// decode -> predict -> encode
    fn handle(&self, model: &Self::Model, body: &str, content_type: &str) -> Result<String> {
        let input = self.decode(body, content_type)?;
        let output = self.predict(&input, model)?;
        self.encode(&output)
    }
}

/// Scores one CSV record with a fitted pipeline and returns the fraud probability
#[derive(Default)]
pub struct FraudScoringHandler {
    loader: ModelLoader,
    extractor: FeatureExtractor,
}

impl FraudScoringHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InferenceHandler for FraudScoringHandler {
    type Model = FittedPipeline;
    type Input = Array2<f64>;
    type Output = f64;

    fn load(&self, model_dir: &Path) -> Result<FittedPipeline> {
        self.loader.load_model(model_dir)
    }

    fn decode(&self, body: &str, content_type: &str) -> Result<Array2<f64>> {
        if content_type != CSV_CONTENT_TYPE {
            bail!("Unsupported content type: {}", content_type);
        }
        self.extractor.parse_csv_record(body)
    }

    fn predict(&self, input: &Array2<f64>, model: &FittedPipeline) -> Result<f64> {
        let proba = model.predict_proba(input)?;
        let fraud_probability = *proba
            .get((0, 1))
            .context("Model returned no probability for the fraud class")?;

        debug!(fraud_probability = fraud_probability, "Record scored");
        Ok(fraud_probability)
    }

    /// Compact serde output: `{"fraud_probability":0.73}`, no space after the colon.
    fn encode(&self, prediction: &f64) -> Result<String> {
        Ok(serde_json::to_string(&FraudScore::new(*prediction))?)
    }

    fn response_content_type(&self) -> &str {
        JSON_CONTENT_TYPE
    }
}

/// A handler bound to one loaded model
pub struct InferenceEngine<H: InferenceHandler = FraudScoringHandler> {
    handler: H,
    model: H::Model,
}

impl InferenceEngine<FraudScoringHandler> {
    /// Load the pipeline artifact from `model_dir` with the default handler.
    pub fn from_model_dir<P: AsRef<Path>>(model_dir: P) -> Result<Self> {
        Self::with_handler(FraudScoringHandler::new(), model_dir)
    }
}

impl<H: InferenceHandler> InferenceEngine<H> {
    pub fn with_handler<P: AsRef<Path>>(handler: H, model_dir: P) -> Result<Self> {
        let model = handler.load(model_dir.as_ref())?;
        Ok(Self { handler, model })
    }

    pub fn model(&self) -> &H::Model {
        &self.model
    }

    pub fn response_content_type(&self) -> &str {
        self.handler.response_content_type()
    }

    /// Run one request through the handler.
    pub fn score(&self, body: &str, content_type: &str) -> Result<String> {
        self.handler.handle(&self.model, body, content_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::logistic::LogisticRegressionParams;
    use crate::types::dataset::Dataset;
    use ndarray::array;

    fn fitted() -> FittedPipeline {
        let dataset = Dataset::new(
            vec!["V1".to_string(), "V2".to_string(), "Amount".to_string()],
            array![
                [-1.0, 0.5, 20.0],
                [-2.0, 0.1, 35.0],
                [-1.5, -0.3, 12.0],
                [1.0, 2.0, 900.0],
                [2.0, 1.5, 750.0],
                [1.5, 2.5, 820.0]
            ],
            array![0, 0, 0, 1, 1, 1],
        )
        .unwrap();
        FittedPipeline::fit(&dataset, &LogisticRegressionParams::default()).unwrap()
    }

    #[test]
    fn test_decode_csv() {
        let input = FraudScoringHandler::new()
            .decode("1.0,2.0,3.0", CSV_CONTENT_TYPE)
            .unwrap();
        assert_eq!(input, array![[1.0, 2.0, 3.0]]);
    }

    #[test]
    fn test_decode_rejects_other_content_types() {
        let handler = FraudScoringHandler::new();
        for content_type in ["application/json", "text/plain", "text/csv; charset=utf-8", ""] {
            let err = handler.decode("1.0,2.0,3.0", content_type).unwrap_err();
            assert!(err.to_string().contains("Unsupported content type"));
        }
    }

    #[test]
    fn test_encode() {
        let body = FraudScoringHandler::new().encode(&0.73).unwrap();
        assert_eq!(body, r#"{"fraud_probability":0.73}"#);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value, serde_json::json!({"fraud_probability": 0.73}));
    }

    #[test]
    fn test_predict_returns_fraud_class_probability() {
        let handler = FraudScoringHandler::new();
        let model = fitted();

        let fraud = handler.predict(&array![[1.8, 2.2, 800.0]], &model).unwrap();
        let legit = handler.predict(&array![[-1.8, 0.0, 15.0]], &model).unwrap();

        assert!((0.0..=1.0).contains(&fraud));
        assert!(fraud > 0.5);
        assert!(legit < 0.5);
    }

    #[test]
    fn test_engine_scores_request() {
        let dir = tempfile::tempdir().unwrap();
        let handler = FraudScoringHandler::new();
        fitted()
            .save(ModelLoader::new().artifact_path(dir.path()))
            .unwrap();

        let engine = InferenceEngine::with_handler(handler, dir.path()).unwrap();
        let body = engine.score("1.8, 2.2, 800.0", CSV_CONTENT_TYPE).unwrap();

        let score: FraudScore = serde_json::from_str(&body).unwrap();
        assert!(score.fraud_probability > 0.5);
        assert_eq!(engine.response_content_type(), JSON_CONTENT_TYPE);
        assert_eq!(engine.model().n_features(), 3);
        assert!(engine.score("1.8,2.2,800.0", "application/json").is_err());
    }

    #[test]
    fn test_engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<InferenceEngine>();
    }

    #[test]
    fn test_load_missing_model_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(InferenceEngine::from_model_dir(dir.path()).is_err());
    }
}
