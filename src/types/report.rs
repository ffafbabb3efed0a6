//! Evaluation report in the schema consumed by the pipeline host

use crate::metrics::ClassificationMetrics;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Literal written in every `standard_deviation` field; the deviation is never computed.
pub const STANDARD_DEVIATION_PLACEHOLDER: &str = "NaN";

/// A single reported statistic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub value: f64,
    pub standard_deviation: String,
}

impl MetricValue {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            standard_deviation: STANDARD_DEVIATION_PLACEHOLDER.to_string(),
        }
    }
}

/// Binary classification metrics, serialized in this field order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryClassificationMetrics {
    pub recall: MetricValue,
    pub precision: MetricValue,
    pub f1: MetricValue,
    pub accuracy: MetricValue,
    pub auc: MetricValue,
}

/// Top-level evaluation document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub binary_classification_metrics: BinaryClassificationMetrics,
}

impl From<&ClassificationMetrics> for EvaluationReport {
    fn from(metrics: &ClassificationMetrics) -> Self {
        Self {
            binary_classification_metrics: BinaryClassificationMetrics {
                recall: MetricValue::new(metrics.recall),
                precision: MetricValue::new(metrics.precision),
                f1: MetricValue::new(metrics.f1),
                accuracy: MetricValue::new(metrics.accuracy),
                auc: MetricValue::new(metrics.auc),
            },
        }
    }
}

impl EvaluationReport {
    /// Compact serde encoding with no whitespace between tokens. Consumers
    /// read the parsed document, so spacing is not part of the schema.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Write the report, creating parent directories as needed.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}
