//! Synthetic minority oversampling (SMOTE).
//!
//! Every class smaller than the majority is grown to the majority count by
//! interpolating between a random minority sample and one of its nearest
//! minority neighbours. Original rows keep their positions; synthetic rows
//! are appended after them.

use anyhow::{bail, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Oversampler configuration
#[derive(Debug, Clone)]
pub struct Smote {
    pub k_neighbors: usize,
    pub random_state: u64,
}

impl Default for Smote {
    fn default() -> Self {
        Self {
            k_neighbors: 5,
            random_state: 42,
        }
    }
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Indices (into `rows`) of the `k` nearest other rows for each row.
fn nearest_neighbors(x: &Array2<f64>, rows: &[usize], k: usize) -> Vec<Vec<usize>> {
    rows.iter()
        .map(|&i| {
            let mut dists: Vec<(f64, usize)> = rows
                .iter()
                .enumerate()
                .filter(|&(_, &j)| j != i)
                .map(|(pos, &j)| (squared_distance(x.row(i), x.row(j)), pos))
                .collect();
            dists.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            dists.into_iter().take(k).map(|(_, pos)| pos).collect()
        })
        .collect()
}

impl Smote {
    pub fn new(k_neighbors: usize, random_state: u64) -> Self {
        Self {
            k_neighbors,
            random_state,
        }
    }

    /// Rebalance `(x, y)` toward parity.
    pub fn fit_resample(&self, x: &Array2<f64>, y: &Array1<u8>) -> Result<(Array2<f64>, Array1<u8>)> {
        if x.nrows() != y.len() {
            bail!(
                "Found inconsistent numbers of samples: {} rows, {} labels",
                x.nrows(),
                y.len()
            );
        }

        let mut by_class: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
        for (i, &label) in y.iter().enumerate() {
            if label > 1 {
                bail!("Unexpected label {}; only binary targets are supported", label);
            }
            by_class[label as usize].push(i);
        }
        if by_class.iter().any(Vec::is_empty) {
            bail!("The target 'y' needs to have more than 1 class");
        }

        let majority = by_class.iter().map(Vec::len).max().unwrap_or(0);
        let mut rng = StdRng::seed_from_u64(self.random_state);

        let mut synthetic_rows: Vec<f64> = Vec::new();
        let mut synthetic_labels: Vec<u8> = Vec::new();

        for (label, rows) in by_class.iter().enumerate() {
            let n_new = majority - rows.len();
            if n_new == 0 {
                continue;
            }

            let k = self.k_neighbors.min(rows.len() - 1);
            debug!(class = label, samples = rows.len(), n_new = n_new, k = k, "Oversampling class");

            let neighbors = nearest_neighbors(x, rows, k);

            for _ in 0..n_new {
                let base_pos = rng.gen_range(0..rows.len());
                let base = x.row(rows[base_pos]);

                if k == 0 {
                    // A lone sample can only be duplicated
                    synthetic_rows.extend(base.iter().copied());
                } else {
                    let nn_pos = neighbors[base_pos][rng.gen_range(0..k)];
                    let neighbor = x.row(rows[nn_pos]);
                    let gap: f64 = rng.gen();
                    synthetic_rows.extend(
                        base.iter()
                            .zip(neighbor.iter())
                            .map(|(b, n)| b + gap * (n - b)),
                    );
                }
                synthetic_labels.push(label as u8);
            }
        }

        let n_synthetic = synthetic_labels.len();
        let synthetic = Array2::from_shape_vec((n_synthetic, x.ncols()), synthetic_rows)?;

        let x_res = ndarray::concatenate(Axis(0), &[x.view(), synthetic.view()])?;
        let y_res = ndarray::concatenate(Axis(0), &[y.view(), Array1::from(synthetic_labels).view()])?;

        Ok((x_res, y_res))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn imbalanced() -> (Array2<f64>, Array1<u8>) {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.2],
            [0.3, 0.1],
            [0.2, 0.4],
            [0.5, 0.5],
            [0.4, 0.3],
            [5.0, 5.0],
            [5.5, 5.2],
            [6.0, 5.8]
        ];
        let y = array![0, 0, 0, 0, 0, 0, 1, 1, 1];
        (x, y)
    }

    #[test]
    fn test_resample_balances_classes() {
        let (x, y) = imbalanced();
        let (x_res, y_res) = Smote::default().fit_resample(&x, &y).unwrap();

        let minority = y_res.iter().filter(|&&l| l == 1).count();
        let majority = y_res.iter().filter(|&&l| l == 0).count();
        assert_eq!(minority, 6);
        assert_eq!(majority, 6);
        assert_eq!(x_res.nrows(), 12);

        // Originals untouched, in place
        assert_eq!(x_res.slice(ndarray::s![..9, ..]), x);
    }

    #[test]
    fn test_synthetic_samples_lie_within_minority_hull() {
        let (x, y) = imbalanced();
        let (x_res, _) = Smote::default().fit_resample(&x, &y).unwrap();

        for row in x_res.slice(ndarray::s![9.., ..]).outer_iter() {
            assert!((5.0..=6.0).contains(&row[0]));
            assert!((5.0..=5.8).contains(&row[1]));
        }
    }

    #[test]
    fn test_resample_is_deterministic() {
        let (x, y) = imbalanced();
        let first = Smote::new(5, 7).fit_resample(&x, &y).unwrap();
        let second = Smote::new(5, 7).fit_resample(&x, &y).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_single_minority_sample_is_duplicated() {
        let x = array![[0.0], [1.0], [2.0], [9.0]];
        let y = array![0, 0, 0, 1];
        let (x_res, y_res) = Smote::default().fit_resample(&x, &y).unwrap();

        assert_eq!(y_res.len(), 6);
        assert_eq!(x_res.slice(ndarray::s![4.., 0]).to_vec(), vec![9.0, 9.0]);
    }

    #[test]
    fn test_single_class_fails() {
        let x = array![[0.0], [1.0]];
        let y = array![1, 1];
        assert!(Smote::default().fit_resample(&x, &y).is_err());
    }
}
