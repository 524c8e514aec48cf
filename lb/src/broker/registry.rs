//! Worker registry entries and the band-computing seam
//!
//! The broker only ever talks to workers through [`BandWorker`], so a pool
//! can mix remote workers and in-process ones.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::{Row, Task};
use crate::rpc::{ErrorKind, RpcClient, RpcConfig, RpcRequest, RpcResponse};
use crate::worker::compute_band;

use super::error::BandError;

/// Anything that can compute one band
#[async_trait]
pub trait BandWorker: Send + Sync {
    /// Address or name used in logs and errors
    fn address(&self) -> &str;

    async fn compute(&self, task: Task) -> Result<Vec<Row>, BandError>;

    /// Ask the worker to stop serving
    async fn shutdown(&self) {}
}

/// A registered worker and its stable position in band order
#[derive(Clone)]
pub struct WorkerEntry {
    pub index: usize,
    pub worker: Arc<dyn BandWorker>,
}

impl WorkerEntry {
    pub fn address(&self) -> &str {
        self.worker.address()
    }
}

impl std::fmt::Debug for WorkerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerEntry")
            .field("index", &self.index)
            .field("address", &self.address())
            .finish()
    }
}

/// Worker reached over RPC
pub struct RemoteWorker {
    client: RpcClient,
}

impl RemoteWorker {
    pub fn new(address: impl Into<String>, config: RpcConfig) -> Self {
        Self {
            client: RpcClient::new(address, config),
        }
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }
}

#[async_trait]
impl BandWorker for RemoteWorker {
    fn address(&self) -> &str {
        self.client.address()
    }

    async fn compute(&self, task: Task) -> Result<Vec<Row>, BandError> {
        debug!(address = %self.address(), start_y = task.start_y, end_y = task.end_y, "RemoteWorker::compute: called");
        let response = self
            .client
            .call(&RpcRequest::ComputeBand { task })
            .await
            .map_err(|e| BandError::Transport(e.to_string()))?;
        match response {
            RpcResponse::Rows { rows } => Ok(rows),
            RpcResponse::Error {
                kind: ErrorKind::InvalidTask,
                message,
            } => Err(BandError::InvalidTask(message)),
            RpcResponse::Error { kind, message } => Err(BandError::Transport(format!("{:?}: {}", kind, message))),
            other => Err(BandError::Malformed(format!("unexpected response {:?}", other))),
        }
    }

    async fn shutdown(&self) {
        if let Err(e) = self.client.shutdown().await {
            warn!(address = %self.address(), error = %e, "RemoteWorker::shutdown: worker did not acknowledge");
        }
    }
}

/// Worker computing in-process on the blocking pool
#[derive(Debug, Clone)]
pub struct LocalWorker {
    name: String,
}

impl LocalWorker {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl BandWorker for LocalWorker {
    fn address(&self) -> &str {
        &self.name
    }

    async fn compute(&self, task: Task) -> Result<Vec<Row>, BandError> {
        tokio::task::spawn_blocking(move || compute_band(&task))
            .await
            .map_err(|e| BandError::Transport(format!("compute task failed: {}", e)))?
            .map_err(|e| BandError::InvalidTask(e.to_string()))
    }
}
