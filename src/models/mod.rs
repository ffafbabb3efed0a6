//! Model fitting, persistence and scoring components

pub mod inference;
pub mod loader;
pub mod logistic;
pub mod pipeline;
pub mod scaler;

pub use inference::{FraudScoringHandler, InferenceEngine, InferenceHandler};
pub use loader::ModelLoader;
pub use pipeline::{FittedPipeline, MODEL_FILE_NAME};
