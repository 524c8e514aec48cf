//! Broker RPC service

use std::sync::Arc;

use async_trait::async_trait;
use eyre::Result;
use tracing::{debug, info, warn};

use crate::domain::Grid;
use crate::rpc::{ErrorKind, RpcConfig, RpcHandler, RpcRequest, RpcResponse, RpcServer};

use super::config::BrokerConfig;
use super::core::Broker;

/// Handler exposing a [`Broker`] over RPC
pub struct BrokerService {
    broker: Arc<Broker>,
    forward_shutdown: bool,
}

impl BrokerService {
    pub fn new(broker: Arc<Broker>, forward_shutdown: bool) -> Self {
        Self {
            broker,
            forward_shutdown,
        }
    }
}

#[async_trait]
impl RpcHandler for BrokerService {
    async fn handle(&self, request: RpcRequest) -> RpcResponse {
        match request {
            RpcRequest::AdvanceTurn { width, height, rows } => {
                debug!(width, height, "BrokerService: AdvanceTurn");
                let grid = match Grid::from_rows(width, height, rows) {
                    Ok(grid) => grid,
                    Err(e) => return RpcResponse::error(ErrorKind::InvalidGrid, e.to_string()),
                };
                match self.broker.advance_turn(grid).await {
                    Ok(next) => RpcResponse::Grid {
                        width: next.width(),
                        height: next.height(),
                        rows: next.into_rows(),
                    },
                    Err(e) => {
                        warn!(error = %e, "BrokerService: turn failed");
                        RpcResponse::error(e.kind(), e.to_string())
                    }
                }
            }
            RpcRequest::AliveCount => RpcResponse::AliveCount {
                count: self.broker.alive_count().await,
            },
            RpcRequest::RegisterWorker { address } => match self.broker.register_address(&address).await {
                Ok(_) => RpcResponse::Ok,
                Err(e) => {
                    warn!(%address, error = %e, "BrokerService: registration failed");
                    RpcResponse::error(e.kind(), e.to_string())
                }
            },
            other => RpcResponse::error(
                ErrorKind::Unsupported,
                format!("broker does not handle {}", other.name()),
            ),
        }
    }

    async fn on_shutdown(&self) {
        info!("Broker shutting down");
        if self.forward_shutdown {
            self.broker.shutdown_workers().await;
        }
    }
}

/// Build a broker from config, register its start-up workers and bind its listener
pub async fn bind_broker(config: &BrokerConfig, rpc: RpcConfig) -> Result<(Arc<Broker>, RpcServer)> {
    let broker = Arc::new(Broker::new(config.failure_policy, rpc.clone()));
    let registered = broker.register_all(&config.workers).await;
    info!(registered, configured = config.workers.len(), "Broker workers registered");
    let service = BrokerService::new(broker.clone(), config.forward_shutdown);
    let server = RpcServer::bind(&config.listen, Arc::new(service), rpc).await?;
    Ok((broker, server))
}
