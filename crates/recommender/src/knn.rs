//! Similarity-gated k-nearest-neighbour rating imputation
//!
//! A reviewer's neighbour candidates are the reviewers with strictly positive
//! similarity to them. Candidates are ranked by Euclidean distance between
//! full rating rows and the closest `k` are averaged, column by column, to
//! fill the reviewer's unknown ratings.

use std::cmp::Ordering;

use ndarray::ArrayView1;
use tracing::{debug, info, instrument};

use review_graph_core::{Result, ReviewGraphError};

use crate::index::ReviewerIndex;
use crate::matrix::{is_unknown, RatingMatrix, SimilarityMatrix};

/// Euclidean distance between two rating rows
///
/// An unknown cell in either row makes the distance unknown (`NaN`).
pub fn euclidean_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Ascending distance, unknown distances last, equal keys keep input order
fn compare_distance(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (true, true) => Ordering::Equal,
    }
}

struct FittedModel {
    reference: RatingMatrix,
    similarity: SimilarityMatrix,
    reviewers: ReviewerIndex,
}

/// KNN imputer over a dense rating matrix
pub struct KnnImputer {
    k: usize,
    model: Option<FittedModel>,
}

impl KnnImputer {
    pub fn new(k: usize) -> Result<Self> {
        if k == 0 {
            return Err(ReviewGraphError::validation_field(
                "neighbour count must be at least 1",
                "knn_neighbors",
            ));
        }

        Ok(Self { k, model: None })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    /// Store the neighbour lookup matrix, reviewer similarities and row mapping
    ///
    /// Neighbour ratings are always read from `reference`, never from a
    /// matrix passed to [`predict`](Self::predict).
    pub fn fit(
        &mut self,
        reference: RatingMatrix,
        similarity: SimilarityMatrix,
        reviewers: ReviewerIndex,
    ) -> Result<()> {
        let rows = reference.nrows();
        if similarity.len() != rows || reviewers.len() != rows {
            return Err(ReviewGraphError::validation(format!(
                "shape mismatch: {} rating rows, {}x{} similarity, {} reviewers",
                rows,
                similarity.len(),
                similarity.len(),
                reviewers.len()
            )));
        }

        self.model = Some(FittedModel {
            reference,
            similarity,
            reviewers,
        });
        Ok(())
    }

    fn fitted(&self) -> Result<&FittedModel> {
        self.model
            .as_ref()
            .ok_or_else(|| ReviewGraphError::validation("KNN imputer has not been fitted"))
    }

    /// Up to `k` closest positive-similarity neighbours of `row`
    pub fn nearest_neighbors(&self, row: usize) -> Result<Vec<usize>> {
        let model = self.fitted()?;
        if row >= model.reference.nrows() {
            return Err(ReviewGraphError::validation(format!(
                "row {} out of range for {} reviewers",
                row,
                model.reference.nrows()
            )));
        }

        let target = model.reference.row(row);
        let mut candidates: Vec<(usize, f64)> = model
            .similarity
            .positive_neighbors(row)
            .into_iter()
            .map(|j| (j, euclidean_distance(target, model.reference.row(j))))
            .collect();

        // Vec::sort_by is stable
        candidates.sort_by(|a, b| compare_distance(a.1, b.1));
        candidates.truncate(self.k);

        Ok(candidates.into_iter().map(|(j, _)| j).collect())
    }

    /// Neighbour reviewer ids of `reviewer_id`
    pub fn nearest_neighbor_ids(&self, reviewer_id: &str) -> Result<Vec<String>> {
        let model = self.fitted()?;
        let row = model
            .reviewers
            .position(reviewer_id)
            .ok_or_else(|| ReviewGraphError::UnknownReviewer(reviewer_id.to_string()))?;

        Ok(self
            .nearest_neighbors(row)?
            .into_iter()
            .filter_map(|j| model.reviewers.key(j).cloned())
            .collect())
    }

    /// Fill the unknown cells of `matrix`
    ///
    /// Known cells are copied through unchanged. A cell stays unknown when
    /// none of the reviewer's neighbours rated that column.
    #[instrument(skip(self, matrix), fields(k = self.k))]
    pub fn predict(&self, matrix: &RatingMatrix) -> Result<RatingMatrix> {
        let model = self.fitted()?;
        if matrix.shape() != model.reference.shape() {
            return Err(ReviewGraphError::validation(format!(
                "expected a {:?} matrix, got {:?}",
                model.reference.shape(),
                matrix.shape()
            )));
        }

        let mut values = matrix.values().clone();
        let mut filled = 0usize;
        let mut isolated = 0usize;

        for row in 0..matrix.nrows() {
            let neighbors = self.nearest_neighbors(row)?;
            if neighbors.is_empty() {
                isolated += 1;
                continue;
            }

            for col in 0..matrix.ncols() {
                if !is_unknown(values[[row, col]]) {
                    continue;
                }

                let known: Vec<f64> = neighbors
                    .iter()
                    .filter_map(|&j| model.reference.get(j, col))
                    .collect();

                if !known.is_empty() {
                    values[[row, col]] = known.iter().sum::<f64>() / known.len() as f64;
                    filled += 1;
                }
            }

            debug!(row, neighbors = neighbors.len(), "Imputed reviewer row");
        }

        info!(filled, isolated, "KNN imputation complete");
        Ok(RatingMatrix::from_array(values))
    }
}
