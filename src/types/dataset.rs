//! Tabular data structures for labeled credit-card records

use anyhow::{bail, Context, Result};
use ndarray::{Array1, Array2, Axis};
use std::fs::{self, File};
use std::path::Path;

/// Name of the binary label column
pub const LABEL_COLUMN: &str = "Class";

/// Numeric table as read from disk, before any column is interpreted
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Column names in file order
    pub headers: Vec<String>,
    /// Cell values, one row per record
    pub values: Array2<f64>,
}

impl RawTable {
    /// Read a delimited text file with a header row; every cell must be numeric.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("Failed to read {}", path.display()))
    }

    /// Parse CSV content from any reader.
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() {
            bail!("Missing header row");
        }

        let mut cells = Vec::new();
        let mut rows = 0;
        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            for (col, field) in record.iter().enumerate() {
                let value: f64 = field.parse().with_context(|| {
                    format!(
                        "Row {}: column '{}' is not numeric: {:?}",
                        row + 1,
                        headers.get(col).map(String::as_str).unwrap_or("?"),
                        field
                    )
                })?;
                cells.push(value);
            }
            rows += 1;
        }

        let values = Array2::from_shape_vec((rows, headers.len()), cells)?;
        Ok(Self { headers, values })
    }

    /// Position of a named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }
}

/// Feature matrix plus binary labels sharing one schema
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Feature column names, in matrix column order
    pub feature_names: Vec<String>,
    /// One row per record
    pub features: Array2<f64>,
    /// `Class` value per record (0 = legitimate, 1 = fraud)
    pub labels: Array1<u8>,
}

impl Dataset {
    /// Build a dataset, checking that the shapes agree.
    pub fn new(feature_names: Vec<String>, features: Array2<f64>, labels: Array1<u8>) -> Result<Self> {
        if features.ncols() != feature_names.len() {
            bail!(
                "Feature matrix has {} columns but {} names were given",
                features.ncols(),
                feature_names.len()
            );
        }
        if features.nrows() != labels.len() {
            bail!(
                "Feature matrix has {} rows but {} labels were given",
                features.nrows(),
                labels.len()
            );
        }
        if let Some(bad) = labels.iter().find(|&&l| l > 1) {
            bail!("Label values must be 0 or 1, found {}", bad);
        }
        Ok(Self {
            feature_names,
            features,
            labels,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Count of records per label, indexed by label value.
    pub fn class_counts(&self) -> [usize; 2] {
        let mut counts = [0; 2];
        for &label in &self.labels {
            counts[label as usize] += 1;
        }
        counts
    }

    /// Subset of rows, in the order given.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            features: self.features.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
        }
    }

    /// Read a table and split off the label column.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let table = RawTable::read_csv(path)?;
        crate::feature_extractor::FeatureExtractor::new().extract(&table)
    }

    /// Write features followed by the label column, with a header row.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let mut wtr = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;

        let mut header: Vec<&str> = self.feature_names.iter().map(String::as_str).collect();
        header.push(LABEL_COLUMN);
        wtr.write_record(&header)?;

        for (row, label) in self.features.outer_iter().zip(self.labels.iter()) {
            let mut record: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            record.push(label.to_string());
            wtr.write_record(&record)?;
        }

        wtr.flush()
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_read_quoted_cells() {
        let csv = "Time,V1,Amount,Class\n0,-1.5,149.62,\"0\"\n1, 2.25 ,2.69,\"1\"\n";
        let table = RawTable::from_reader(csv.as_bytes()).unwrap();

        assert_eq!(table.headers, vec!["Time", "V1", "Amount", "Class"]);
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.values[[1, 1]], 2.25);
        assert_eq!(table.values[[1, 3]], 1.0);
        assert_eq!(table.column_index("Amount"), Some(2));
        assert_eq!(table.column_index("Missing"), None);
    }

    #[test]
    fn test_non_numeric_cell_is_rejected() {
        let csv = "V1,Class\nabc,0\n";
        let err = RawTable::from_reader(csv.as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("V1"));
    }

    #[test]
    fn test_dataset_shape_mismatch() {
        let result = Dataset::new(
            vec!["a".to_string()],
            array![[1.0, 2.0]],
            array![0],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_write_then_read_keeps_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("train.csv");

        let dataset = Dataset::new(
            vec!["V1".to_string(), "Amount".to_string()],
            array![[0.5, 10.0], [-1.25, 3.5]],
            array![0, 1],
        )
        .unwrap();
        dataset.write_csv(&path).unwrap();

        let header = std::fs::read_to_string(&path).unwrap();
        assert!(header.starts_with("V1,Amount,Class\n"));

        let loaded = Dataset::read_csv(&path).unwrap();
        assert_eq!(loaded, dataset);
        assert_eq!(loaded.class_counts(), [1, 1]);
    }
}
