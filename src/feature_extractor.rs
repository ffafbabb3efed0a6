//! Feature extraction for credit-card fraud records.
//!
//! Turns raw numeric tables into (features, label) datasets and parses
//! single-record request bodies into model input rows. Feature order always
//! follows the source column order, so the same schema flows from the
//! preprocessor through training, evaluation and inference.

use crate::types::dataset::{Dataset, RawTable, LABEL_COLUMN};
use anyhow::{bail, Context, Result};
use ndarray::{Array1, Array2, Axis};

/// Column dropped from the raw source before splitting
pub const TIME_COLUMN: &str = "Time";

/// Separates the label column from feature columns, optionally dropping others.
pub struct FeatureExtractor {
    label_column: String,
    dropped_columns: Vec<String>,
}

impl FeatureExtractor {
    /// Extractor that keeps every non-label column.
    pub fn new() -> Self {
        Self {
            label_column: LABEL_COLUMN.to_string(),
            dropped_columns: Vec::new(),
        }
    }

    /// Extractor for the raw source table: `Time` is dropped unconditionally.
    pub fn for_raw_source() -> Self {
        Self::new().dropping(TIME_COLUMN)
    }

    /// Drop an additional column; its absence becomes a fatal error.
    pub fn dropping(mut self, column: &str) -> Self {
        self.dropped_columns.push(column.to_string());
        self
    }

    /// Split a raw table into a dataset.
    ///
    /// Fails if the label column or any dropped column is missing, or if a
    /// label is anything other than 0 or 1.
    pub fn extract(&self, table: &RawTable) -> Result<Dataset> {
        let label_idx = table
            .column_index(&self.label_column)
            .with_context(|| format!("Missing required column '{}'", self.label_column))?;

        let mut excluded = vec![label_idx];
        for column in &self.dropped_columns {
            let idx = table
                .column_index(column)
                .with_context(|| format!("Missing required column '{}'", column))?;
            excluded.push(idx);
        }

        let keep: Vec<usize> = (0..table.headers.len())
            .filter(|i| !excluded.contains(i))
            .collect();

        let feature_names = keep.iter().map(|&i| table.headers[i].clone()).collect();
        let features = table.values.select(Axis(1), &keep);

        let labels = table
            .values
            .column(label_idx)
            .iter()
            .enumerate()
            .map(|(row, &v)| match v {
                v if v == 0.0 => Ok(0u8),
                v if v == 1.0 => Ok(1u8),
                other => bail!(
                    "Row {}: '{}' must be 0 or 1, found {}",
                    row + 1,
                    self.label_column,
                    other
                ),
            })
            .collect::<Result<Array1<u8>>>()?;

        Dataset::new(feature_names, features, labels)
    }

    /// Parse one comma-separated record into a single-row matrix.
    pub fn parse_csv_record(&self, body: &str) -> Result<Array2<f64>> {
        let values = body
            .trim()
            .split(',')
            .map(|field| {
                let field = field.trim();
                field
                    .parse::<f64>()
                    .with_context(|| format!("Could not convert {:?} to float", field))
            })
            .collect::<Result<Vec<f64>>>()?;

        let n = values.len();
        Ok(Array2::from_shape_vec((1, n), values)?)
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}
