//! Binary logistic regression with L2 penalty and balanced class weights.
//!
//! Minimizes `0.5 * |w|^2 + C * sum_i s_i * logloss(y_i, w.x_i + b)` where
//! `s_i` is the balanced weight of sample i's class. The intercept is not
//! penalized. Newton steps are taken until the gradient max-norm drops
//! below `tol` or `max_iter` is exhausted.

use anyhow::{bail, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Hyperparameters for fitting
#[derive(Debug, Clone)]
pub struct LogisticRegressionParams {
    pub c: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for LogisticRegressionParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tol: 1e-4,
        }
    }
}

/// Fitted linear classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coef: Array1<f64>,
    pub intercept: f64,
    /// Newton iterations performed
    pub n_iter: usize,
    pub converged: bool,
}

/// `n_samples / (n_classes * count_c)` for each sample's class
pub fn balanced_sample_weights(y: &Array1<u8>) -> Result<Array1<f64>> {
    let n = y.len() as f64;
    let n_pos = y.iter().filter(|&&l| l == 1).count() as f64;
    let n_neg = n - n_pos;
    if n_pos == 0.0 || n_neg == 0.0 {
        bail!("This solver needs samples of at least 2 classes in the data");
    }

    let w_pos = n / (2.0 * n_pos);
    let w_neg = n / (2.0 * n_neg);
    Ok(y.mapv(|l| if l == 1 { w_pos } else { w_neg }))
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Solve `a * x = b` for symmetric positive definite `a` via Cholesky.
fn solve_spd(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let n = b.len();
    let mut l = Array2::<f64>::zeros((n, n));

    for j in 0..n {
        let mut diag = a[[j, j]];
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        if diag <= 0.0 || !diag.is_finite() {
            bail!("Hessian is not positive definite");
        }
        let d = diag.sqrt();
        l[[j, j]] = d;

        for i in (j + 1)..n {
            let mut s = a[[i, j]];
            for k in 0..j {
                s -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = s / d;
        }
    }

    // Forward substitution: L y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut s = b[i];
        for k in 0..i {
            s -= l[[i, k]] * y[k];
        }
        y[i] = s / l[[i, i]];
    }

    // Back substitution: L^T x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut s = y[i];
        for k in (i + 1)..n {
            s -= l[[k, i]] * x[k];
        }
        x[i] = s / l[[i, i]];
    }

    Ok(x)
}

impl LogisticRegression {
    /// Fit on (already scaled) features with balanced class weights.
    pub fn fit(x: &Array2<f64>, y: &Array1<u8>, params: &LogisticRegressionParams) -> Result<Self> {
        if x.nrows() != y.len() {
            bail!(
                "Found inconsistent numbers of samples: {} rows, {} labels",
                x.nrows(),
                y.len()
            );
        }
        if params.max_iter == 0 {
            bail!("max_iter must be positive");
        }

        let weights = balanced_sample_weights(y)? * params.c;
        let targets = y.mapv(|l| l as f64);

        let n = x.nrows();
        let d = x.ncols();
        // Design matrix with a trailing intercept column
        let mut design = Array2::<f64>::ones((n, d + 1));
        design.slice_mut(ndarray::s![.., ..d]).assign(x);

        let mut theta = Array1::<f64>::zeros(d + 1);
        let mut converged = false;
        let mut n_iter = 0;

        while n_iter < params.max_iter {
            let z = design.dot(&theta);
            let p = z.mapv(sigmoid);

            let residual = (&p - &targets) * &weights;
            let mut grad = design.t().dot(&residual);
            for j in 0..d {
                grad[j] += theta[j];
            }

            let grad_norm = grad.iter().fold(0.0_f64, |m, g| m.max(g.abs()));
            if grad_norm <= params.tol {
                converged = true;
                break;
            }

            let curvature = (&p * &(1.0 - &p)) * &weights;
            let weighted = &design * &curvature.insert_axis(Axis(1));
            let mut hessian = design.t().dot(&weighted);
            for j in 0..=d {
                // Unit ridge on coefficients, tiny jitter on the intercept
                hessian[[j, j]] += if j < d { 1.0 } else { 1e-10 };
            }

            let step = solve_spd(&hessian, &grad)?;
            theta -= &step;
            n_iter += 1;
        }

        if converged {
            debug!(iterations = n_iter, "Logistic regression converged");
        } else {
            warn!(
                max_iter = params.max_iter,
                "Logistic regression failed to converge; increase max_iter"
            );
        }

        Ok(Self {
            coef: theta.slice(ndarray::s![..d]).to_owned(),
            intercept: theta[d],
            n_iter,
            converged,
        })
    }

    pub fn n_features(&self) -> usize {
        self.coef.len()
    }

    /// Signed distance to the decision boundary per row.
    pub fn decision_function(&self, x: &Array2<f64>) -> Array1<f64> {
        x.dot(&self.coef) + self.intercept
    }

    /// Column 0: P(class 0); column 1: P(class 1)
    pub fn predict_proba(&self, x: &Array2<f64>) -> Array2<f64> {
        let p1 = self.decision_function(x).mapv(sigmoid);
        let mut proba = Array2::<f64>::zeros((x.nrows(), 2));
        proba.column_mut(1).assign(&p1);
        proba.column_mut(0).assign(&p1.mapv(|p| 1.0 - p));
        proba
    }

    pub fn predict(&self, x: &Array2<f64>) -> Array1<u8> {
        self.decision_function(x).mapv(|z| u8::from(z > 0.0))
    }
}
