//! In-memory collaborators

use std::sync::Arc;

use async_trait::async_trait;
use eyre::{Result, bail};
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::Grid;

use super::{CellSource, SnapshotSink};

/// Serves one fixed grid
#[derive(Debug, Clone)]
pub struct MemoryInput {
    grid: Grid,
}

impl MemoryInput {
    pub fn new(grid: Grid) -> Self {
        Self { grid }
    }
}

#[async_trait]
impl CellSource for MemoryInput {
    async fn read_cells(&self, identifier: &str, width: usize, height: usize) -> Result<Vec<bool>> {
        debug!(%identifier, "MemoryInput::read_cells: called");
        if (width, height) != (self.grid.width(), self.grid.height()) {
            bail!(
                "Input {} is {}x{}, requested {}x{}",
                identifier,
                self.grid.width(),
                self.grid.height(),
                width,
                height
            );
        }
        Ok(self.grid.to_cells())
    }
}

/// Records every snapshot it is given, in order
#[derive(Debug, Clone, Default)]
pub struct MemoryOutput {
    snapshots: Arc<Mutex<Vec<(String, Grid)>>>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshots(&self) -> Vec<(String, Grid)> {
        self.snapshots.lock().await.clone()
    }

    pub async fn identifiers(&self) -> Vec<String> {
        self.snapshots.lock().await.iter().map(|(id, _)| id.clone()).collect()
    }
}

#[async_trait]
impl SnapshotSink for MemoryOutput {
    async fn write(&self, identifier: &str, grid: Grid) -> Result<()> {
        debug!(%identifier, "MemoryOutput::write: called");
        self.snapshots.lock().await.push((identifier.to_string(), grid));
        Ok(())
    }

    async fn wait_idle(&self) -> Result<()> {
        Ok(())
    }
}
