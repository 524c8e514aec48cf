//! Worker RPC service

use std::sync::Arc;

use async_trait::async_trait;
use eyre::Result;
use tracing::{debug, info, warn};

use crate::rpc::{ErrorKind, RpcConfig, RpcHandler, RpcRequest, RpcResponse, RpcServer};

use super::compute::compute_band;

/// Stateless handler answering `ComputeBand`
#[derive(Debug, Default, Clone)]
pub struct WorkerService;

#[async_trait]
impl RpcHandler for WorkerService {
    async fn handle(&self, request: RpcRequest) -> RpcResponse {
        match request {
            RpcRequest::ComputeBand { task } => {
                debug!(start_y = task.start_y, end_y = task.end_y, "WorkerService: ComputeBand");
                // Large bands are CPU-bound; keep them off the reactor threads
                let result = tokio::task::spawn_blocking(move || compute_band(&task)).await;
                match result {
                    Ok(Ok(rows)) => RpcResponse::Rows { rows },
                    Ok(Err(e)) => {
                        warn!(error = %e, "WorkerService: rejected task");
                        RpcResponse::error(ErrorKind::InvalidTask, e.to_string())
                    }
                    Err(e) => RpcResponse::error(ErrorKind::Transport, format!("compute task failed: {}", e)),
                }
            }
            other => RpcResponse::error(
                ErrorKind::Unsupported,
                format!("worker does not handle {}", other.name()),
            ),
        }
    }

    async fn on_shutdown(&self) {
        info!("Worker shutting down");
    }
}

/// Bind a worker server on `address`
pub async fn bind_worker(address: &str, config: RpcConfig) -> Result<RpcServer> {
    RpcServer::bind(address, Arc::new(WorkerService), config).await
}
