//! Input and output collaborators
//!
//! A run seeds its grid from a [`CellSource`] and persists snapshots
//! through a [`SnapshotSink`]. Writes may complete in the background;
//! `wait_idle` returns once everything handed to the sink is persisted.

mod memory;
mod random;
mod text;

use async_trait::async_trait;
use eyre::Result;

use crate::domain::Grid;

pub use memory::{MemoryInput, MemoryOutput};
pub use random::RandomInput;
pub use text::TextDirOutput;

/// Yields `width * height` cells in row-major order
#[async_trait]
pub trait CellSource: Send + Sync {
    async fn read_cells(&self, identifier: &str, width: usize, height: usize) -> Result<Vec<bool>>;
}

/// Persists grid snapshots under an identifier
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    async fn write(&self, identifier: &str, grid: Grid) -> Result<()>;

    /// Wait until every write handed to the sink has been persisted
    async fn wait_idle(&self) -> Result<()>;
}

/// Identifier of the initial grid, `"{W}x{H}"`
pub fn input_identifier(width: usize, height: usize) -> String {
    format!("{}x{}", width, height)
}

/// Identifier of a snapshot taken at `turn`, `"{W}x{H}x{turn}"`
pub fn snapshot_identifier(width: usize, height: usize, turn: usize) -> String {
    format!("{}x{}x{}", width, height, turn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers() {
        assert_eq!(input_identifier(16, 8), "16x8");
        assert_eq!(snapshot_identifier(16, 8, 100), "16x8x100");
    }
}
