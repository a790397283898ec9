//! Reproducible train/test masking of known ratings

use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use review_graph_core::{MaskSampling, Result, ReviewGraphError};

use crate::matrix::{RatingMatrix, UNKNOWN};

/// Training copy of a rating matrix plus the coordinates hidden from it
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: RatingMatrix,
    /// Drawn coordinates in draw order; may repeat when sampled with replacement
    pub masked: Vec<(usize, usize)>,
}

impl TrainTestSplit {
    /// Masked coordinates with duplicates removed, sorted
    pub fn distinct_masked(&self) -> Vec<(usize, usize)> {
        let mut cells = self.masked.clone();
        cells.sort_unstable();
        cells.dedup();
        cells
    }
}

/// Hide `floor(ratio * K)` of the `K` known cells of `matrix`
///
/// Draws come from a ChaCha8 stream seeded with `seed`, indexing the known
/// cells in row-major order, so the same seed and matrix yield the same mask
/// on every platform. `matrix` itself is left untouched.
pub fn mask_known_ratings(
    matrix: &RatingMatrix,
    ratio: f64,
    seed: u64,
    sampling: MaskSampling,
) -> Result<TrainTestSplit> {
    if !(ratio > 0.0 && ratio <= 1.0) {
        return Err(ReviewGraphError::validation_field(
            format!("mask ratio must be in (0, 1], got {}", ratio),
            "mask_ratio",
        ));
    }

    let known = matrix.known_cells();
    let draws = (ratio * known.len() as f64).floor() as usize;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let masked: Vec<(usize, usize)> = match sampling {
        MaskSampling::WithReplacement => (0..draws)
            .map(|_| known[rng.gen_range(0..known.len() as u64) as usize])
            .collect(),
        MaskSampling::WithoutReplacement => index::sample(&mut rng, known.len(), draws)
            .into_iter()
            .map(|i| known[i])
            .collect(),
    };

    let mut values = matrix.values().clone();
    for &(row, col) in &masked {
        values[[row, col]] = UNKNOWN;
    }

    debug!(
        known = known.len(),
        draws,
        ?sampling,
        "Masked known ratings"
    );

    Ok(TrainTestSplit {
        train: RatingMatrix::from_array(values),
        masked,
    })
}
