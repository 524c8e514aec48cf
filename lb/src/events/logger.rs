//! Event Logger - persists a run's events to a JSONL file

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use tracing::debug;

use super::types::{Event, EventLogEntry};

/// Appends one JSON line per event
pub struct EventLogger {
    path: PathBuf,
    run_id: String,
    writer: BufWriter<File>,
}

impl EventLogger {
    /// Open (or create) `path` for appending, creating parent directories
    pub fn create(path: impl AsRef<Path>, run_id: impl Into<String>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        debug!(?path, "EventLogger::create: called");
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context(format!("Failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .context(format!("Failed to open event log {}", path.display()))?;
        Ok(Self {
            path,
            run_id: run_id.into(),
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_event(&mut self, event: &Event) -> Result<()> {
        let entry = EventLogEntry::new(self.run_id.clone(), event.clone());
        let json = serde_json::to_string(&entry)?;
        writeln!(self.writer, "{}", json)?;
        self.writer.flush()?;
        Ok(())
    }
}
