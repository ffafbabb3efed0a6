//! Type definitions for the fraud model pipeline

pub mod dataset;
pub mod report;
pub mod score;

pub use dataset::{Dataset, RawTable, LABEL_COLUMN};
pub use report::{EvaluationReport, MetricValue};
pub use score::FraudScore;
