//! The turn-advancing seam used by the controller
//!
//! A controller drives a [`TurnEngine`] without knowing whether turns run
//! on a remote broker, an in-process broker, or a single local thread.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::Grid;
use crate::rpc::{ErrorKind, RpcClient, RpcConfig, RpcRequest, RpcResponse};

use super::core::Broker;
use super::error::BrokerError;

#[async_trait]
pub trait TurnEngine: Send + Sync {
    /// Compute the next generation of `grid`
    async fn advance_turn(&self, grid: Grid) -> Result<Grid, BrokerError>;

    /// Live cells in the engine's most recent grid
    async fn alive_count(&self) -> Result<usize, BrokerError>;

    /// Release the engine; with `shutdown_remote` also stop the serving side
    async fn close(&self, shutdown_remote: bool);
}

#[async_trait]
impl TurnEngine for Broker {
    async fn advance_turn(&self, grid: Grid) -> Result<Grid, BrokerError> {
        Broker::advance_turn(self, grid).await
    }

    async fn alive_count(&self) -> Result<usize, BrokerError> {
        Ok(Broker::alive_count(self).await)
    }

    async fn close(&self, shutdown_remote: bool) {
        if shutdown_remote {
            self.shutdown_workers().await;
        }
    }
}

/// Single-threaded reference engine
#[derive(Debug, Default)]
pub struct LocalEngine {
    cache: Mutex<Option<Grid>>,
}

impl LocalEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TurnEngine for LocalEngine {
    async fn advance_turn(&self, grid: Grid) -> Result<Grid, BrokerError> {
        *self.cache.lock().await = Some(grid.clone());
        let next = tokio::task::spawn_blocking(move || grid.next_generation())
            .await
            .map_err(|e| BrokerError::Internal(format!("compute task failed: {}", e)))?;
        *self.cache.lock().await = Some(next.clone());
        Ok(next)
    }

    async fn alive_count(&self) -> Result<usize, BrokerError> {
        Ok(self.cache.lock().await.as_ref().map_or(0, Grid::count_alive))
    }

    async fn close(&self, _shutdown_remote: bool) {}
}

/// Broker reached over RPC
#[derive(Debug, Clone)]
pub struct RemoteBroker {
    client: RpcClient,
}

impl RemoteBroker {
    pub fn new(address: impl Into<String>, config: RpcConfig) -> Self {
        Self {
            client: RpcClient::new(address, config),
        }
    }

    pub fn address(&self) -> &str {
        self.client.address()
    }

    /// Check the broker answers and return its version
    pub async fn ping(&self) -> Result<String, BrokerError> {
        Ok(self.client.ping().await?)
    }

    /// Ask the broker to add a worker to its pool
    pub async fn register_worker(&self, address: &str) -> Result<(), BrokerError> {
        debug!(%address, "RemoteBroker::register_worker: called");
        let request = RpcRequest::RegisterWorker {
            address: address.to_string(),
        };
        match self.client.call(&request).await? {
            RpcResponse::Ok => Ok(()),
            other => Err(remote_error(other)),
        }
    }
}

#[async_trait]
impl TurnEngine for RemoteBroker {
    async fn advance_turn(&self, grid: Grid) -> Result<Grid, BrokerError> {
        let (width, height) = (grid.width(), grid.height());
        let request = RpcRequest::AdvanceTurn {
            width,
            height,
            rows: grid.into_rows(),
        };
        match self.client.call(&request).await? {
            RpcResponse::Grid {
                width: next_width,
                height: next_height,
                rows,
            } => {
                let next = Grid::from_rows(next_width, next_height, rows)?;
                next.ensure_shape(width, height)?;
                Ok(next)
            }
            other => Err(remote_error(other)),
        }
    }

    async fn alive_count(&self) -> Result<usize, BrokerError> {
        match self.client.call(&RpcRequest::AliveCount).await? {
            RpcResponse::AliveCount { count } => Ok(count),
            other => Err(remote_error(other)),
        }
    }

    async fn close(&self, shutdown_remote: bool) {
        if shutdown_remote {
            info!(address = %self.address(), "Asking broker to shut down");
            if let Err(e) = self.client.shutdown().await {
                warn!(address = %self.address(), error = %e, "RemoteBroker::close: shutdown not acknowledged");
            }
        }
        self.client.close();
    }
}

fn remote_error(response: RpcResponse) -> BrokerError {
    match response {
        RpcResponse::Error {
            kind: ErrorKind::NoWorkers,
            ..
        } => BrokerError::NoWorkers,
        RpcResponse::Error { kind, message } => BrokerError::Remote { kind, message },
        other => BrokerError::Internal(format!("unexpected response {:?}", other)),
    }
}
