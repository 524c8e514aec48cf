//! Toroidal grid of binary cells
//!
//! The grid is the authoritative unit of state that flows between the
//! controller, the broker and the workers. Width and height are fixed for
//! the lifetime of a run; every coordinate lookup wraps on both axes.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// One row of cells, `true` meaning alive
pub type Row = Vec<bool>;

/// Errors from grid construction
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("grid dimensions must be positive (got {width}x{height})")]
    EmptyDimensions { width: usize, height: usize },

    #[error("expected {expected} cells, got {actual}")]
    CellCountMismatch { expected: usize, actual: usize },

    #[error("expected {expected} rows, got {actual}")]
    RowCountMismatch { expected: usize, actual: usize },

    #[error("row {row} has width {actual}, expected {expected}")]
    RowWidthMismatch { row: usize, expected: usize, actual: usize },

    #[error("expected a {expected_width}x{expected_height} grid, got {width}x{height}")]
    ShapeMismatch {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },
}

/// A cell coordinate, `0 <= x < width`, `0 <= y < height`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

impl Cell {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Dense rectangular grid with toroidal indexing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GridRepr", into = "GridRepr")]
pub struct Grid {
    width: usize,
    height: usize,
    rows: Vec<Row>,
}

/// Wire shape of a grid; validated into a [`Grid`] on the way in
#[derive(Serialize, Deserialize)]
struct GridRepr {
    width: usize,
    height: usize,
    #[serde(with = "rows_codec")]
    rows: Vec<Row>,
}

impl TryFrom<GridRepr> for Grid {
    type Error = GridError;

    fn try_from(repr: GridRepr) -> Result<Self, Self::Error> {
        Grid::from_rows(repr.width, repr.height, repr.rows)
    }
}

impl From<Grid> for GridRepr {
    fn from(grid: Grid) -> Self {
        Self {
            width: grid.width,
            height: grid.height,
            rows: grid.rows,
        }
    }
}

impl Grid {
    /// Create an all-dead grid
    pub fn new(width: usize, height: usize) -> Result<Self, GridError> {
        debug!(width, height, "Grid::new: called");
        if width == 0 || height == 0 {
            return Err(GridError::EmptyDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            rows: vec![vec![false; width]; height],
        })
    }

    /// Build a grid from cells supplied in row-major order
    pub fn from_cells(width: usize, height: usize, cells: impl IntoIterator<Item = bool>) -> Result<Self, GridError> {
        debug!(width, height, "Grid::from_cells: called");
        let mut grid = Self::new(width, height)?;
        let mut count = 0;
        for (i, alive) in cells.into_iter().enumerate() {
            if i < width * height {
                grid.rows[i / width][i % width] = alive;
            }
            count += 1;
        }
        if count != width * height {
            return Err(GridError::CellCountMismatch {
                expected: width * height,
                actual: count,
            });
        }
        Ok(grid)
    }

    /// Build a grid from rows, validating that the shape matches
    pub fn from_rows(width: usize, height: usize, rows: Vec<Row>) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::EmptyDimensions { width, height });
        }
        if rows.len() != height {
            return Err(GridError::RowCountMismatch {
                expected: height,
                actual: rows.len(),
            });
        }
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(GridError::RowWidthMismatch {
                row,
                expected: width,
                actual: r.len(),
            });
        }
        Ok(Self { width, height, rows })
    }

    /// Parse a grid from text rows using `#` for alive and anything else for dead
    pub fn parse(lines: &[&str]) -> Result<Self, GridError> {
        let width = lines.first().map(|l| l.chars().count()).unwrap_or(0);
        let rows = lines.iter().map(|l| l.chars().map(|c| c == '#').collect()).collect();
        Self::from_rows(width, lines.len(), rows)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Fail unless this grid is `width` x `height`
    pub fn ensure_shape(&self, width: usize, height: usize) -> Result<(), GridError> {
        if self.width != width || self.height != height {
            return Err(GridError::ShapeMismatch {
                expected_width: width,
                expected_height: height,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Row `y`, wrapping vertically for any signed offset
    pub fn row_wrapped(&self, y: isize) -> &Row {
        &self.rows[y.rem_euclid(self.height as isize) as usize]
    }

    /// Cell state at `(x, y)`, wrapping on both axes
    pub fn get(&self, x: isize, y: isize) -> bool {
        let x = x.rem_euclid(self.width as isize) as usize;
        self.row_wrapped(y)[x]
    }

    /// Set the cell at `(x, y)`, wrapping on both axes
    pub fn set(&mut self, x: isize, y: isize, alive: bool) {
        let x = x.rem_euclid(self.width as isize) as usize;
        let y = y.rem_euclid(self.height as isize) as usize;
        self.rows[y][x] = alive;
    }

    /// Number of live cells
    pub fn count_alive(&self) -> usize {
        self.rows.iter().map(|r| r.iter().filter(|c| **c).count()).sum()
    }

    /// Coordinates of every live cell, row-major
    pub fn alive_cells(&self) -> Vec<Cell> {
        self.cells_where(|x, y| self.rows[y][x])
    }

    /// Coordinates whose state differs between `self` and `next`
    ///
    /// Both grids must share dimensions; cells outside the smaller grid are ignored.
    pub fn diff(&self, next: &Grid) -> Vec<Cell> {
        self.cells_where(|x, y| next.rows.get(y).and_then(|r| r.get(x)).is_some_and(|c| *c != self.rows[y][x]))
    }

    /// Cells in row-major order
    pub fn to_cells(&self) -> Vec<bool> {
        self.rows.iter().flatten().copied().collect()
    }

    /// Number of live neighbours of `(x, y)` on the torus
    pub fn live_neighbours(&self, x: usize, y: usize) -> u8 {
        let (x, y) = (x as isize, y as isize);
        let mut count = 0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                if (dx, dy) != (0, 0) && self.get(x + dx, y + dy) {
                    count += 1;
                }
            }
        }
        count
    }

    /// Next generation computed in a single unpartitioned pass
    pub fn next_generation(&self) -> Grid {
        let rows = (0..self.height)
            .map(|y| {
                (0..self.width)
                    .map(|x| next_state(self.rows[y][x], self.live_neighbours(x, y)))
                    .collect()
            })
            .collect();
        Grid {
            width: self.width,
            height: self.height,
            rows,
        }
    }

    fn cells_where(&self, pred: impl Fn(usize, usize) -> bool) -> Vec<Cell> {
        let mut cells = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                if pred(x, y) {
                    cells.push(Cell::new(x, y));
                }
            }
        }
        cells
    }
}

/// Conway's transition rule
pub fn next_state(alive: bool, live_neighbours: u8) -> bool {
    matches!((alive, live_neighbours), (true, 2) | (true, 3) | (false, 3))
}

/// Compact row encoding: one char per cell, `#` alive and `.` dead
pub mod rows_codec {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde::ser::SerializeSeq;

    use super::Row;

    pub const ALIVE: char = '#';
    pub const DEAD: char = '.';

    pub fn encode_row(row: &[bool]) -> String {
        row.iter().map(|c| if *c { ALIVE } else { DEAD }).collect()
    }

    pub fn decode_row(s: &str) -> Result<Row, String> {
        s.chars()
            .map(|c| match c {
                ALIVE => Ok(true),
                DEAD => Ok(false),
                other => Err(format!("invalid cell character {:?}", other)),
            })
            .collect()
    }

    pub fn serialize<S: Serializer>(rows: &[Row], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(rows.len()))?;
        for row in rows {
            seq.serialize_element(&encode_row(row))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Row>, D::Error> {
        let encoded = Vec::<String>::deserialize(deserializer)?;
        encoded
            .iter()
            .map(|s| decode_row(s).map_err(serde::de::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glider() -> Grid {
        Grid::parse(&[".#..", "..#.", "###.", "...."]).unwrap()
    }

    #[test]
    fn test_new_rejects_empty_dimensions() {
        assert_eq!(
            Grid::new(0, 4),
            Err(GridError::EmptyDimensions { width: 0, height: 4 })
        );
    }

    #[test]
    fn test_from_cells_row_major() {
        let grid = Grid::from_cells(3, 2, [true, false, false, false, false, true]).unwrap();
        assert!(grid.get(0, 0));
        assert!(grid.get(2, 1));
        assert_eq!(grid.count_alive(), 2);
    }

    #[test]
    fn test_from_cells_wrong_count() {
        let err = Grid::from_cells(2, 2, [true, false, true]).unwrap_err();
        assert_eq!(err, GridError::CellCountMismatch { expected: 4, actual: 3 });
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let err = Grid::from_rows(2, 2, vec![vec![true, false], vec![true]]).unwrap_err();
        assert!(matches!(err, GridError::RowWidthMismatch { row: 1, .. }));
    }

    #[test]
    fn test_toroidal_indexing() {
        let grid = glider();
        assert_eq!(grid.get(-3, 0), grid.get(1, 0));
        assert_eq!(grid.get(1, 4), grid.get(1, 0));
        assert_eq!(grid.row_wrapped(-1), grid.row_wrapped(3));
    }

    #[test]
    fn test_alive_cells_and_count() {
        let grid = glider();
        assert_eq!(grid.count_alive(), 5);
        assert_eq!(
            grid.alive_cells(),
            vec![
                Cell::new(1, 0),
                Cell::new(2, 1),
                Cell::new(0, 2),
                Cell::new(1, 2),
                Cell::new(2, 2)
            ]
        );
    }

    #[test]
    fn test_clone_is_independent() {
        let original = glider();
        let mut copy = original.clone();
        assert_eq!(copy, original);
        copy.set(3, 3, true);
        assert_ne!(copy, original);
        assert!(!original.get(3, 3));
    }

    #[test]
    fn test_diff_reports_changed_cells() {
        let before = glider();
        let mut after = before.clone();
        after.set(1, 0, false);
        after.set(3, 3, true);
        assert_eq!(before.diff(&after), vec![Cell::new(1, 0), Cell::new(3, 3)]);
        assert!(before.diff(&before).is_empty());
    }

    #[test]
    fn test_next_generation_glider() {
        let grid = Grid::parse(&[".#....", "..#...", "###...", "......", "......", "......"]).unwrap();
        let expected = Grid::parse(&["......", "#.#...", ".##...", ".#....", "......", "......"]).unwrap();
        assert_eq!(grid.next_generation(), expected);
    }

    #[test]
    fn test_next_generation_small_torus_wraps() {
        // On a 4x4 torus the glider touches its own wrapped image
        let expected = Grid::parse(&["....", "#.##", ".###", "#.#."]).unwrap();
        assert_eq!(glider().next_generation(), expected);
    }

    #[test]
    fn test_neighbours_wrap_horizontally() {
        let mut grid = Grid::new(5, 3).unwrap();
        grid.set(4, 1, true);
        assert_eq!(grid.live_neighbours(0, 1), 1);
        // (4, 1) directly above, (0, 0) across both seams
        grid.set(0, 0, true);
        assert_eq!(grid.live_neighbours(4, 2), 2);
    }

    #[test]
    fn test_rule_table() {
        for n in 0..=8u8 {
            assert_eq!(next_state(true, n), n == 2 || n == 3, "live cell with {} neighbours", n);
            assert_eq!(next_state(false, n), n == 3, "dead cell with {} neighbours", n);
        }
    }

    #[test]
    fn test_serialize_compact_rows() {
        let grid = Grid::parse(&["#.", ".#"]).unwrap();
        let json = serde_json::to_string(&grid).unwrap();
        assert_eq!(json, r##"{"width":2,"height":2,"rows":["#.",".#"]}"##);
    }

    #[test]
    fn test_deserialize_rejects_wrong_shape() {
        let json = r##"{"width":3,"height":1,"rows":["#."]}"##;
        assert!(serde_json::from_str::<Grid>(json).is_err());
    }

    #[test]
    fn test_deserialize_rejects_bad_cell() {
        let json = r##"{"width":2,"height":1,"rows":["#x"]}"##;
        assert!(serde_json::from_str::<Grid>(json).is_err());
    }
}
