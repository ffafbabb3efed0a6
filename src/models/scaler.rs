//! Per-feature standardization

use anyhow::{bail, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Fitted zero-mean, unit-variance transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Array1<f64>,
    /// Population standard deviation; constant features keep a scale of 1.0
    pub scale: Array1<f64>,
}

impl StandardScaler {
    /// Learn column means and deviations.
    pub fn fit(x: &Array2<f64>) -> Result<Self> {
        if x.nrows() == 0 {
            bail!("Cannot fit a scaler on zero rows");
        }

        let mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(x.ncols()));
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s == 0.0 || !s.is_finite() { 1.0 } else { s });

        Ok(Self { mean, scale })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features() {
            bail!(
                "X has {} features, but StandardScaler is expecting {} features as input",
                x.ncols(),
                self.n_features()
            );
        }
        Ok((x - &self.mean) / &self.scale)
    }
}
