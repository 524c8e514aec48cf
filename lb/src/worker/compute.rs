//! Per-band transition
//!
//! Pure function of a [`Task`]: no state survives between calls.

use thiserror::Error;
use tracing::debug;

use crate::domain::{Row, Task, next_state};

/// Reasons a task is rejected before any computation happens
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("invalid task: non-positive height")]
    NonPositiveHeight,

    #[error("invalid task: insufficient rows")]
    InsufficientRows,

    #[error("invalid task: ragged rows")]
    RaggedRows,
}

/// Compute the next generation of the band's own rows
///
/// `task.rows[1..=height]` are the band; the first and last rows are halo
/// context. Vertical neighbours are read straight from the buffer, horizontal
/// neighbours wrap on the row width.
pub fn compute_band(task: &Task) -> Result<Vec<Row>, TaskError> {
    debug!(start_y = task.start_y, end_y = task.end_y, rows = task.rows.len(), "compute_band: called");
    if task.end_y <= task.start_y {
        return Err(TaskError::NonPositiveHeight);
    }
    let height = task.end_y - task.start_y;
    if task.rows.len() < height + 2 {
        return Err(TaskError::InsufficientRows);
    }
    let width = task.rows[0].len();
    if task.rows[..height + 2].iter().any(|r| r.len() != width) {
        return Err(TaskError::RaggedRows);
    }

    let buffer = &task.rows;
    let result = (1..=height)
        .map(|src_y| {
            (0..width)
                .map(|x| {
                    let left = (x + width - 1) % width;
                    let right = (x + 1) % width;
                    let mut neighbours = 0u8;
                    for row in [&buffer[src_y - 1], &buffer[src_y], &buffer[src_y + 1]] {
                        neighbours += row[left] as u8 + row[right] as u8;
                    }
                    neighbours += buffer[src_y - 1][x] as u8 + buffer[src_y + 1][x] as u8;
                    next_state(buffer[src_y][x], neighbours)
                })
                .collect()
        })
        .collect();
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Band, Grid, partition};
    use proptest::prelude::*;

    fn task(start_y: usize, end_y: usize, lines: &[&str]) -> Task {
        Task {
            start_y,
            end_y,
            rows: Grid::parse(lines).unwrap().into_rows(),
        }
    }

    /// 3x3 buffer whose centre has exactly `n` live neighbours
    fn centre_with_neighbours(alive: bool, n: usize) -> Task {
        let positions = [(0, 0), (1, 0), (2, 0), (0, 1), (2, 1), (0, 2), (1, 2), (2, 2)];
        let mut rows = vec![vec![false; 5]; 3];
        for &(x, y) in positions.iter().take(n) {
            rows[y][x + 1] = true;
        }
        rows[1][2] = alive;
        Task { start_y: 0, end_y: 1, rows }
    }

    #[test]
    fn test_rejects_non_positive_height() {
        let t = task(3, 3, &["...", "...", "..."]);
        assert_eq!(compute_band(&t), Err(TaskError::NonPositiveHeight));
        let t = Task {
            start_y: 4,
            end_y: 2,
            rows: vec![],
        };
        assert_eq!(compute_band(&t).unwrap_err().to_string(), "invalid task: non-positive height");
    }

    #[test]
    fn test_rejects_insufficient_rows() {
        let t = task(0, 2, &["...", "...", "..."]);
        let err = compute_band(&t).unwrap_err();
        assert_eq!(err, TaskError::InsufficientRows);
        assert_eq!(err.to_string(), "invalid task: insufficient rows");
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let t = Task {
            start_y: 0,
            end_y: 1,
            rows: vec![vec![false; 3], vec![false; 2], vec![false; 3]],
        };
        assert_eq!(compute_band(&t), Err(TaskError::RaggedRows));
    }

    #[test]
    fn test_rule_table_for_every_neighbour_count() {
        for n in 0..=8 {
            for alive in [true, false] {
                let rows = compute_band(&centre_with_neighbours(alive, n)).unwrap();
                assert_eq!(rows.len(), 1);
                let expected = if alive { n == 2 || n == 3 } else { n == 3 };
                assert_eq!(rows[0][2], expected, "alive={} neighbours={}", alive, n);
            }
        }
    }

    #[test]
    fn test_horizontal_wraparound() {
        // Column 0 and column W-1 are neighbours: a vertical blinker straddling the seam
        let t = task(0, 3, &["....", "#...", "#...", "#...", "...."]);
        let rows = compute_band(&t).unwrap();
        assert_eq!(rows[1], vec![true, true, false, true]);
    }

    #[test]
    fn test_halo_rows_feed_edge_neighbours() {
        // A live halo row above a single-row band gives every cell 3 neighbours
        let t = task(5, 6, &["###", "...", "..."]);
        assert_eq!(compute_band(&t).unwrap(), vec![vec![true, true, true]]);
    }

    #[test]
    fn test_output_rows_match_band_height() {
        let t = task(2, 5, &[".....", ".###.", ".....", ".....", ".....", "....."]);
        assert_eq!(compute_band(&t).unwrap().len(), 3);
    }

    proptest! {
        #[test]
        fn prop_partitioned_merge_equals_single_pass(
            cells in prop::collection::vec(any::<bool>(), 1..=144),
            width in 1usize..=12,
            workers in 1usize..=12,
        ) {
            let height = (cells.len() / width).max(1);
            let cells: Vec<bool> = cells.into_iter().chain(std::iter::repeat(false)).take(width * height).collect();
            let grid = Grid::from_cells(width, height, cells).unwrap();

            let mut merged = Vec::with_capacity(height);
            for band in partition(height, workers.min(height)) {
                merged.extend(compute_band(&Task::for_band(&grid, band)).unwrap());
            }
            prop_assert_eq!(Grid::from_rows(width, height, merged).unwrap(), grid.next_generation());
        }
    }

    #[test]
    fn test_band_helper_round_trips() {
        let t = task(1, 3, &["...", "...", "...", "..."]);
        assert_eq!(t.band(), Band::new(1, 3));
    }
}
