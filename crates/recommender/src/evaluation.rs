//! Imputation quality over held-out ratings

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use review_graph_core::{Result, ReviewGraphError};

use crate::matrix::RatingMatrix;

/// Outcome of comparing imputed ratings against ground truth
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    /// Distinct held-out cells
    pub masked: usize,
    /// Held-out cells the imputer filled
    pub imputed: usize,
    /// Held-out cells still unknown after imputation
    pub unimputed: usize,
    /// Mean absolute error over imputed cells, `None` if nothing was imputed
    pub mae: Option<f64>,
}

impl EvaluationReport {
    pub fn unimputed_fraction(&self) -> f64 {
        if self.masked == 0 {
            return 0.0;
        }
        self.unimputed as f64 / self.masked as f64
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Masked ratings:       {}", self.masked)?;
        writeln!(
            f,
            "Unimputed fraction:   {:.4} ({} of {})",
            self.unimputed_fraction(),
            self.unimputed,
            self.masked
        )?;
        match self.mae {
            Some(mae) => write!(f, "MAE over imputed:     {:.4}", mae),
            None => write!(f, "MAE over imputed:     n/a"),
        }
    }
}

/// Compare `predicted` with `truth` at every held-out coordinate
///
/// Duplicate coordinates count once.
pub fn evaluate(
    truth: &RatingMatrix,
    predicted: &RatingMatrix,
    masked: &[(usize, usize)],
) -> Result<EvaluationReport> {
    if truth.shape() != predicted.shape() {
        return Err(ReviewGraphError::validation(format!(
            "cannot compare a {:?} matrix with a {:?} matrix",
            truth.shape(),
            predicted.shape()
        )));
    }

    let cells: BTreeSet<(usize, usize)> = masked.iter().copied().collect();
    let mut abs_error = 0.0;
    let mut imputed = 0usize;

    for &(row, col) in &cells {
        let actual = truth.get(row, col).ok_or_else(|| {
            ReviewGraphError::validation(format!(
                "held-out cell ({}, {}) has no ground-truth rating",
                row, col
            ))
        })?;

        if let Some(estimate) = predicted.get(row, col) {
            abs_error += (estimate - actual).abs();
            imputed += 1;
        }
    }

    Ok(EvaluationReport {
        masked: cells.len(),
        imputed,
        unimputed: cells.len() - imputed,
        mae: (imputed > 0).then(|| abs_error / imputed as f64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::UNKNOWN;

    #[test]
    fn test_evaluate_mixed_cells() {
        let truth = RatingMatrix::from_rows(&[vec![4.0, 2.0], vec![5.0, 1.0]]);
        let predicted = RatingMatrix::from_rows(&[vec![3.0, 2.0], vec![UNKNOWN, 2.0]]);

        let report = evaluate(&truth, &predicted, &[(0, 0), (1, 0), (1, 1), (0, 0)]).unwrap();

        assert_eq!(report.masked, 3);
        assert_eq!(report.imputed, 2);
        assert_eq!(report.unimputed, 1);
        assert_eq!(report.mae, Some(1.0));
        assert!((report.unimputed_fraction() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_evaluate_nothing_imputed() {
        let truth = RatingMatrix::from_rows(&[vec![4.0]]);
        let predicted = RatingMatrix::from_rows(&[vec![UNKNOWN]]);

        let report = evaluate(&truth, &predicted, &[(0, 0)]).unwrap();

        assert_eq!(report.mae, None);
        assert_eq!(report.unimputed_fraction(), 1.0);
        assert!(report.to_string().contains("n/a"));
    }

    #[test]
    fn test_evaluate_empty_mask() {
        let truth = RatingMatrix::unknown(1, 1);
        let report = evaluate(&truth, &truth, &[]).unwrap();
        assert_eq!(report.masked, 0);
        assert_eq!(report.unimputed_fraction(), 0.0);
    }

    #[test]
    fn test_evaluate_shape_mismatch() {
        let a = RatingMatrix::unknown(1, 2);
        let b = RatingMatrix::unknown(2, 1);
        assert!(evaluate(&a, &b, &[]).is_err());
    }
}
