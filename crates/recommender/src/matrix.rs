//! Dense reviewer × item rating matrix and reviewer × reviewer similarity matrix
//!
//! Missing ratings are stored as `NaN` ([`UNKNOWN`]).

use ndarray::{Array2, ArrayView1};
use tracing::{debug, warn};

use review_graph_core::{ReviewGraphError, Result, ReviewRecord};

use crate::artifact::SimilarityRecord;
use crate::index::{ItemIndex, ReviewerIndex};

/// Sentinel for "no rating recorded"
pub const UNKNOWN: f64 = f64::NAN;

pub fn is_unknown(value: f64) -> bool {
    value.is_nan()
}

/// Reviewer × item ratings with unknown cells
#[derive(Debug, Clone, PartialEq)]
pub struct RatingMatrix {
    values: Array2<f64>,
}

impl RatingMatrix {
    /// Matrix with every cell unknown
    pub fn unknown(rows: usize, cols: usize) -> Self {
        Self {
            values: Array2::from_elem((rows, cols), UNKNOWN),
        }
    }

    pub fn from_array(values: Array2<f64>) -> Self {
        Self { values }
    }

    #[cfg(test)]
    pub(crate) fn from_rows(rows: &[Vec<f64>]) -> Self {
        let cols = rows.first().map_or(0, Vec::len);
        let flat: Vec<f64> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        let values = Array2::from_shape_vec((rows.len(), cols), flat)
            .unwrap_or_else(|_| panic!("rows must all have {} columns", cols));
        Self { values }
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    /// Known rating at a cell, `None` if unknown or out of bounds
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values
            .get((row, col))
            .copied()
            .filter(|v| !is_unknown(*v))
    }

    pub fn row(&self, row: usize) -> ArrayView1<'_, f64> {
        self.values.row(row)
    }

    pub(crate) fn set(&mut self, row: usize, col: usize, value: f64) {
        self.values[[row, col]] = value;
    }

    /// Coordinates of every known cell, row-major
    pub fn known_cells(&self) -> Vec<(usize, usize)> {
        self.values
            .indexed_iter()
            .filter(|(_, v)| !is_unknown(**v))
            .map(|(coord, _)| coord)
            .collect()
    }

    pub fn known_count(&self) -> usize {
        self.values.iter().filter(|v| !is_unknown(**v)).count()
    }
}

/// Counters from one rating matrix build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatingBuildStats {
    pub ratings_written: usize,
    /// Reviews whose reviewer has no matrix row
    pub skipped_unknown_reviewer: usize,
}

/// Accumulates reviews into a [`RatingMatrix`]
///
/// Reviews from reviewers missing from the row index are dropped; reviews of
/// items missing from the column index are an error, the catalog being the
/// authority on item identity. Duplicate reviewer/item pairs keep the last
/// rating seen.
pub struct RatingMatrixBuilder<'a> {
    reviewers: &'a ReviewerIndex,
    items: &'a ItemIndex,
    matrix: RatingMatrix,
    stats: RatingBuildStats,
}

impl<'a> RatingMatrixBuilder<'a> {
    pub fn new(reviewers: &'a ReviewerIndex, items: &'a ItemIndex) -> Self {
        Self {
            reviewers,
            items,
            matrix: RatingMatrix::unknown(reviewers.len(), items.len()),
            stats: RatingBuildStats::default(),
        }
    }

    pub fn add(&mut self, review: &ReviewRecord) -> Result<()> {
        let Some(row) = self.reviewers.position(review.reviewer_id.as_str()) else {
            self.stats.skipped_unknown_reviewer += 1;
            return Ok(());
        };

        let col = self.items.position(&review.item_key()).ok_or_else(|| {
            ReviewGraphError::UnknownItem {
                asin: review.asin.clone(),
                type_id: review.type_id,
            }
        })?;

        self.matrix.set(row, col, review.overall);
        self.stats.ratings_written += 1;
        Ok(())
    }

    pub fn extend<'r, I>(&mut self, reviews: I) -> Result<()>
    where
        I: IntoIterator<Item = &'r ReviewRecord>,
    {
        for review in reviews {
            self.add(review)?;
        }
        Ok(())
    }

    pub fn build(self) -> (RatingMatrix, RatingBuildStats) {
        debug!(
            written = self.stats.ratings_written,
            skipped = self.stats.skipped_unknown_reviewer,
            "Rating matrix built"
        );
        (self.matrix, self.stats)
    }
}

/// Symmetric reviewer × reviewer similarity with a zero diagonal
///
/// Cells without a recorded similarity are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    values: Array2<f64>,
}

impl SimilarityMatrix {
    pub fn zeros(n: usize) -> Self {
        Self {
            values: Array2::zeros((n, n)),
        }
    }

    /// Build from similarity records, writing each into both symmetric cells
    ///
    /// # Errors
    ///
    /// Returns `UnknownReviewer` when a record names a reviewer missing from
    /// `reviewers`. Self-similarities are skipped.
    pub fn from_records(reviewers: &ReviewerIndex, records: &[SimilarityRecord]) -> Result<Self> {
        let mut matrix = Self::zeros(reviewers.len());

        for record in records {
            let i = reviewers
                .position(record.user1.as_str())
                .ok_or_else(|| ReviewGraphError::UnknownReviewer(record.user1.clone()))?;
            let j = reviewers
                .position(record.user2.as_str())
                .ok_or_else(|| ReviewGraphError::UnknownReviewer(record.user2.clone()))?;

            if i == j {
                warn!(reviewer = %record.user1, "Ignoring self-similarity edge");
                continue;
            }

            matrix.values[[i, j]] = record.similarity;
            matrix.values[[j, i]] = record.similarity;
        }

        Ok(matrix)
    }

    #[cfg(test)]
    pub(crate) fn from_rows(rows: &[Vec<f64>]) -> Self {
        let n = rows.len();
        let flat: Vec<f64> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        let values = Array2::from_shape_vec((n, n), flat)
            .unwrap_or_else(|_| panic!("similarity matrix must be {}x{}", n, n));
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[[i, j]]
    }

    /// Rows with strictly positive similarity to `row`, ascending
    pub fn positive_neighbors(&self, row: usize) -> Vec<usize> {
        self.values
            .row(row)
            .iter()
            .enumerate()
            .filter(|(_, s)| **s > 0.0)
            .map(|(j, _)| j)
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn is_symmetric(&self) -> bool {
        let n = self.len();
        (0..n).all(|i| self.values[[i, i]] == 0.0)
            && (0..n).all(|i| (i + 1..n).all(|j| self.values[[i, j]] == self.values[[j, i]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use review_graph_core::ItemKey;

    fn reviewers(ids: &[&str]) -> ReviewerIndex {
        ReviewerIndex::from_keys(ids.iter().map(|s| s.to_string()))
    }

    fn items() -> ItemIndex {
        ItemIndex::from_keys(vec![
            ItemKey::new("X", 0),
            ItemKey::new("Y", 0),
            ItemKey::new("X", 1),
        ])
    }

    #[test]
    fn test_builder_places_ratings() {
        let reviewers = reviewers(&["A", "B"]);
        let items = items();
        let mut builder = RatingMatrixBuilder::new(&reviewers, &items);

        builder
            .add(&ReviewRecord::new("B", "X", 1, 4.0).unwrap())
            .unwrap();
        let (matrix, stats) = builder.build();

        assert_eq!(matrix.shape(), (2, 3));
        assert_eq!(matrix.get(1, 2), Some(4.0));
        assert_eq!(matrix.get(1, 0), None);
        assert_eq!(matrix.known_count(), 1);
        assert_eq!(stats.ratings_written, 1);
    }

    #[test]
    fn test_builder_skips_unknown_reviewer() {
        let reviewers = reviewers(&["A"]);
        let items = items();
        let mut builder = RatingMatrixBuilder::new(&reviewers, &items);

        builder
            .add(&ReviewRecord::new("GHOST", "X", 0, 5.0).unwrap())
            .unwrap();
        let (matrix, stats) = builder.build();

        assert_eq!(matrix.known_count(), 0);
        assert_eq!(stats.skipped_unknown_reviewer, 1);
    }

    #[test]
    fn test_builder_rejects_unknown_item() {
        let reviewers = reviewers(&["A"]);
        let items = items();
        let mut builder = RatingMatrixBuilder::new(&reviewers, &items);

        let err = builder
            .add(&ReviewRecord::new("A", "Z", 0, 5.0).unwrap())
            .unwrap_err();
        assert!(matches!(err, ReviewGraphError::UnknownItem { type_id: 0, .. }));
    }

    #[test]
    fn test_builder_duplicate_last_write_wins() {
        let reviewers = reviewers(&["A"]);
        let items = items();
        let mut builder = RatingMatrixBuilder::new(&reviewers, &items);

        let reviews = vec![
            ReviewRecord::new("A", "Y", 0, 2.0).unwrap(),
            ReviewRecord::new("A", "Y", 0, 5.0).unwrap(),
        ];
        builder.extend(&reviews).unwrap();

        assert_eq!(builder.build().0.get(0, 1), Some(5.0));
    }

    #[test]
    fn test_known_cells_row_major() {
        let matrix = RatingMatrix::from_rows(&[
            vec![UNKNOWN, 3.0],
            vec![1.0, UNKNOWN],
        ]);
        assert_eq!(matrix.known_cells(), vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_similarity_matrix_symmetric_zero_diagonal() {
        let reviewers = reviewers(&["A", "B", "C"]);
        let records = vec![
            SimilarityRecord::new("A", "B", 0.5),
            SimilarityRecord::new("C", "A", 0.25),
            SimilarityRecord::new("B", "B", 1.0),
        ];

        let matrix = SimilarityMatrix::from_records(&reviewers, &records).unwrap();

        assert!(matrix.is_symmetric());
        assert_eq!(matrix.get(0, 1), 0.5);
        assert_eq!(matrix.get(0, 2), 0.25);
        assert_eq!(matrix.get(1, 1), 0.0);
        assert_eq!(matrix.positive_neighbors(0), vec![1, 2]);
        assert!(matrix.positive_neighbors(1) == vec![0]);
    }

    #[test]
    fn test_similarity_matrix_unknown_reviewer() {
        let reviewers = reviewers(&["A"]);
        let records = vec![SimilarityRecord::new("A", "Q", 0.5)];

        let err = SimilarityMatrix::from_records(&reviewers, &records).unwrap_err();
        assert!(matches!(err, ReviewGraphError::UnknownReviewer(id) if id == "Q"));
    }
}
