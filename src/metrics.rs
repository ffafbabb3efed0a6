//! Classification metrics for evaluating fraud models.

use anyhow::{bail, Result};
use tracing::info;

/// Counts of a binary confusion matrix (positive class = 1)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_positives: u64,
    pub false_positives: u64,
    pub true_negatives: u64,
    pub false_negatives: u64,
}

impl ConfusionMatrix {
    /// Tally predictions against ground truth.
    pub fn from_labels(y_true: &[u8], y_pred: &[u8]) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            bail!(
                "Found inconsistent numbers of samples: {} labels, {} predictions",
                y_true.len(),
                y_pred.len()
            );
        }

        let mut matrix = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t == 1, p == 1) {
                (true, true) => matrix.true_positives += 1,
                (false, true) => matrix.false_positives += 1,
                (false, false) => matrix.true_negatives += 1,
                (true, false) => matrix.false_negatives += 1,
            }
        }
        Ok(matrix)
    }

    pub fn total(&self) -> u64 {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    /// tp / (tp + fp), zero when nothing was predicted positive
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// tp / (tp + fn), zero when there are no positives
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    /// Harmonic mean of precision and recall
    pub fn f1(&self) -> f64 {
        ratio(
            2 * self.true_positives,
            2 * self.true_positives + self.false_positives + self.false_negatives,
        )
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Area under the ROC curve via the rank statistic; tied scores share their average rank.
///
/// Fails when `y_true` holds a single class, since the curve is undefined.
pub fn roc_auc_score(y_true: &[u8], y_score: &[f64]) -> Result<f64> {
    if y_true.len() != y_score.len() {
        bail!(
            "Found inconsistent numbers of samples: {} labels, {} scores",
            y_true.len(),
            y_score.len()
        );
    }

    let n_pos = y_true.iter().filter(|&&t| t == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        bail!("Only one class present in y_true. ROC AUC score is not defined in that case.");
    }

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[a].total_cmp(&y_score[b]));

    // Average 1-based ranks over runs of tied scores
    let mut ranks = vec![0.0; order.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && y_score[order[end]] == y_score[order[start]] {
            end += 1;
        }
        let avg_rank = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg_rank;
        }
        start = end;
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|(&t, _)| t == 1)
        .map(|(_, &r)| r)
        .sum();

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Ok((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// The five statistics reported for a binary classifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub accuracy: f64,
    pub auc: f64,
}

impl ClassificationMetrics {
    /// Score hard predictions. AUC treats the predicted labels themselves as scores.
    pub fn from_predictions(y_true: &[u8], y_pred: &[u8]) -> Result<Self> {
        let matrix = ConfusionMatrix::from_labels(y_true, y_pred)?;
        let scores: Vec<f64> = y_pred.iter().map(|&p| p as f64).collect();

        Ok(Self {
            precision: matrix.precision(),
            recall: matrix.recall(),
            f1: matrix.f1(),
            accuracy: matrix.accuracy(),
            auc: roc_auc_score(y_true, &scores)?,
        })
    }

    /// Log summary statistics
    pub fn log_summary(&self, matrix: &ConfusionMatrix) {
        info!("╔══════════════════════════════════════════════╗");
        info!("║        FRAUD MODEL - EVALUATION SUMMARY      ║");
        info!("╠══════════════════════════════════════════════╣");
        info!(
            "║ Samples: {:>8}  │  Positives: {:>8}     ║",
            matrix.total(),
            matrix.true_positives + matrix.false_negatives
        );
        info!(
            "║ TP={:<7} FP={:<7} TN={:<7} FN={:<7}║",
            matrix.true_positives, matrix.false_positives, matrix.true_negatives, matrix.false_negatives
        );
        info!("╠══════════════════════════════════════════════╣");
        info!("║ Precision: {:>6.4}   Recall: {:>6.4}           ║", self.precision, self.recall);
        info!("║ F1 Score:  {:>6.4}   Accuracy: {:>6.4}         ║", self.f1, self.accuracy);
        info!("║ AUC:       {:>6.4}                            ║", self.auc);
        info!("╚══════════════════════════════════════════════╝");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 3 TP, 1 FP, 4 TN, 2 FN
    const Y_TRUE: [u8; 10] = [1, 1, 1, 1, 1, 0, 0, 0, 0, 0];
    const Y_PRED: [u8; 10] = [1, 1, 1, 0, 0, 1, 0, 0, 0, 0];

    #[test]
    fn test_confusion_matrix() {
        let matrix = ConfusionMatrix::from_labels(&Y_TRUE, &Y_PRED).unwrap();
        assert_eq!(
            matrix,
            ConfusionMatrix {
                true_positives: 3,
                false_positives: 1,
                true_negatives: 4,
                false_negatives: 2,
            }
        );
    }

    #[test]
    fn test_hand_computed_metrics() {
        let metrics = ClassificationMetrics::from_predictions(&Y_TRUE, &Y_PRED).unwrap();

        assert_eq!(metrics.precision, 0.75);
        assert_eq!(metrics.recall, 0.6);
        assert!((metrics.f1 - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(metrics.accuracy, 0.7);
        // Hard labels as scores: AUC = (TPR + TNR) / 2 = (0.6 + 0.8) / 2
        assert!((metrics.auc - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_zero_division_yields_zero() {
        let metrics = ClassificationMetrics::from_predictions(&[1, 0, 0], &[0, 0, 0]).unwrap();
        assert_eq!(metrics.precision, 0.0);
        assert_eq!(metrics.recall, 0.0);
        assert_eq!(metrics.f1, 0.0);
        assert!((metrics.auc - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_roc_auc_with_continuous_scores() {
        let y_true = [0, 0, 1, 1];
        let y_score = [0.1, 0.4, 0.35, 0.8];
        let auc = roc_auc_score(&y_true, &y_score).unwrap();
        assert!((auc - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_roc_auc_single_class_fails() {
        assert!(roc_auc_score(&[1, 1, 1], &[0.2, 0.5, 0.9]).is_err());
    }

    #[test]
    fn test_length_mismatch_fails() {
        assert!(ConfusionMatrix::from_labels(&[1, 0], &[1]).is_err());
        assert!(roc_auc_score(&[1, 0], &[0.5]).is_err());
    }
}
