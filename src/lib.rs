//! Fraud Model Pipeline Library
//!
//! Batch stages for a credit-card fraud classifier: stratified preprocessing,
//! oversampled logistic-regression training, metric evaluation, and
//! single-record scoring callbacks for a serving host.

pub mod cli;
pub mod config;
pub mod evaluator;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod preprocessor;
pub mod resample;
pub mod trainer;
pub mod types;

pub use config::AppConfig;
pub use evaluator::Evaluator;
pub use feature_extractor::FeatureExtractor;
pub use models::inference::{FraudScoringHandler, InferenceEngine, InferenceHandler};
pub use models::pipeline::FittedPipeline;
pub use preprocessor::Preprocessor;
pub use trainer::Trainer;
pub use types::{dataset::Dataset, report::EvaluationReport, score::FraudScore};
