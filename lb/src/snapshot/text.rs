//! Plain-text snapshot directory
//!
//! Each snapshot becomes `<dir>/<identifier>.txt`, one line per row in the
//! wire row encoding. Writes run in the background until `wait_idle`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use eyre::{Context, Result, eyre};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::domain::{Grid, rows_codec};

use super::SnapshotSink;

pub struct TextDirOutput {
    dir: PathBuf,
    pending: Mutex<JoinSet<Result<PathBuf>>>,
}

impl TextDirOutput {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).context(format!("Failed to create output dir {}", dir.display()))?;
        Ok(Self {
            dir,
            pending: Mutex::new(JoinSet::new()),
        })
    }

    pub fn path_for(&self, identifier: &str) -> PathBuf {
        self.dir.join(format!("{}.txt", identifier))
    }
}

#[async_trait]
impl SnapshotSink for TextDirOutput {
    async fn write(&self, identifier: &str, grid: Grid) -> Result<()> {
        let path = self.path_for(identifier);
        debug!(?path, "TextDirOutput::write: queued");
        self.pending.lock().await.spawn(async move {
            let mut content = String::with_capacity((grid.width() + 1) * grid.height());
            for row in grid.rows() {
                content.push_str(&rows_codec::encode_row(row));
                content.push('\n');
            }
            tokio::fs::write(&path, content)
                .await
                .context(format!("Failed to write snapshot {}", path.display()))?;
            Ok(path)
        });
        Ok(())
    }

    async fn wait_idle(&self) -> Result<()> {
        let mut pending = self.pending.lock().await;
        let mut first_error = None;
        while let Some(joined) = pending.join_next().await {
            match joined.map_err(|e| eyre!("Snapshot task failed: {}", e)).and_then(|r| r) {
                Ok(path) => info!(?path, "Snapshot written"),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
