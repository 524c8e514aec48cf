//! Row bands and halo tasks
//!
//! A band is a half-open row range assigned to one worker. A task is a band
//! plus its two wraparound halo rows, taken from the global grid so that
//! every band can be computed independently of the others.

use serde::{Deserialize, Serialize};

use super::grid::{Grid, Row, rows_codec};

/// Half-open row range `[start_y, end_y)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    pub start_y: usize,
    pub end_y: usize,
}

impl Band {
    pub fn new(start_y: usize, end_y: usize) -> Self {
        Self { start_y, end_y }
    }

    pub fn height(&self) -> usize {
        self.end_y.saturating_sub(self.start_y)
    }
}

/// Split `[0, height)` into `workers` contiguous bands
///
/// The first `workers - 1` bands get `height / workers` rows each and the
/// last band absorbs the remainder. With more workers than rows the leading
/// bands are empty; callers skip those when dispatching.
pub fn partition(height: usize, workers: usize) -> Vec<Band> {
    if workers == 0 {
        return Vec::new();
    }
    let rows_per_worker = height / workers;
    (0..workers)
        .map(|i| {
            let start_y = i * rows_per_worker;
            let end_y = if i == workers - 1 { height } else { start_y + rows_per_worker };
            Band::new(start_y, end_y)
        })
        .collect()
}

/// A band plus its halo rows: `rows[0]` is the global row above the band,
/// `rows[height + 1]` the global row below it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub start_y: usize,
    pub end_y: usize,
    #[serde(with = "rows_codec")]
    pub rows: Vec<Row>,
}

impl Task {
    /// Build the task for `band` from the full input grid
    pub fn for_band(grid: &Grid, band: Band) -> Self {
        let above = band.start_y as isize - 1;
        let mut rows = Vec::with_capacity(band.height() + 2);
        rows.push(grid.row_wrapped(above).clone());
        rows.extend_from_slice(&grid.rows()[band.start_y..band.end_y]);
        rows.push(grid.row_wrapped(band.end_y as isize).clone());
        Self {
            start_y: band.start_y,
            end_y: band.end_y,
            rows,
        }
    }

    pub fn band(&self) -> Band {
        Band::new(self.start_y, self.end_y)
    }
}
