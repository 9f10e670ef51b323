use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::item::Item;

/// Outcome of one assignment pass.
///
/// Indices refer to the slices handed to [`distance_matrix`]: rows are
/// observations, columns are previously tracked items. Every row index and
/// every column index appears exactly once across the three lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Accepted pairs as `(observation index, tracked index)`, in the order
    /// they were accepted.
    pub matches: Vec<(usize, usize)>,
    /// Observation indices left without a partner. These become new tracks.
    pub unmatched_observations: Vec<usize>,
    /// Tracked-item indices left without a partner. These face the lifecycle
    /// rules for missed items.
    pub unmatched_tracked: Vec<usize>,
}

/// Builds the pairwise distance matrix, one row per observation and one
/// column per tracked item.
///
/// Entries are [`Item::distance_to`] with the observation as receiver, so
/// observation weights drive the average. Every entry is independent of the
/// others, which lets the fill run in parallel; the matrix is complete before
/// any matching decision reads it.
pub fn distance_matrix(observations: &[Item], tracked: &[Item]) -> DMatrix<f64> {
    let rows = observations.len();
    let cols = tracked.len();
    if rows == 0 || cols == 0 {
        return DMatrix::from_element(rows, cols, f64::INFINITY);
    }

    let entries: Vec<f64> = (0..rows * cols)
        .into_par_iter()
        .map(|index| observations[index / cols].distance_to(&tracked[index % cols]))
        .collect();
    DMatrix::from_row_slice(rows, cols, &entries)
}

/// Greedy nearest-first assignment over a distance matrix.
///
/// Repeatedly accepts the smallest remaining entry while it is finite and at
/// most `threshold` (the threshold is the largest distance that still
/// matches), then discards that entry's whole row and column. Equal smallest
/// entries resolve to the first one in row-major order. This is a single-pass
/// heuristic, not a global minimum-cost assignment.
///
/// # Arguments
///
/// * `distance` - pairwise distances, unmatchable pairs at `f64::INFINITY`
/// * `threshold` - inclusive upper bound for accepting a pair
pub fn greedy_match(distance: &DMatrix<f64>, threshold: f64) -> Assignment {
    let rows = distance.nrows();
    let cols = distance.ncols();
    let mut remaining = distance.clone();
    let mut row_taken = vec![false; rows];
    let mut col_taken = vec![false; cols];
    let mut matches = Vec::new();

    loop {
        let mut best: Option<(usize, usize, f64)> = None;
        for row in 0..rows {
            for col in 0..cols {
                let entry = remaining[(row, col)];
                if best.map_or(true, |(_, _, smallest)| entry < smallest) {
                    best = Some((row, col, entry));
                }
            }
        }
        let (row, col, entry) = match best {
            Some(found) => found,
            None => break,
        };
        if !entry.is_finite() || entry > threshold {
            break;
        }

        log::trace!("matched observation {row} to tracked item {col} at distance {entry:.4}");
        matches.push((row, col));
        row_taken[row] = true;
        col_taken[col] = true;
        for other in 0..cols {
            remaining[(row, other)] = f64::INFINITY;
        }
        for other in 0..rows {
            remaining[(other, col)] = f64::INFINITY;
        }
    }

    Assignment {
        matches,
        unmatched_observations: (0..rows).filter(|&row| !row_taken[row]).collect(),
        unmatched_tracked: (0..cols).filter(|&col| !col_taken[col]).collect(),
    }
}
