//! RPC client for calling a worker or the broker
//!
//! Every call opens its own TCP connection, so concurrent calls on one
//! client never queue behind each other.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use super::config::RpcConfig;
use super::frame::{read_frame, write_frame};
use super::messages::{RpcRequest, RpcResponse};
use super::RpcError;

/// Client for one remote node
#[derive(Debug, Clone)]
pub struct RpcClient {
    address: String,
    config: RpcConfig,
    closed: Arc<AtomicBool>,
}

impl RpcClient {
    pub fn new(address: impl Into<String>, config: RpcConfig) -> Self {
        let address = address.into();
        debug!(%address, "RpcClient::new: called");
        Self {
            address,
            config,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout()
    }

    /// Refuse further calls from this client and every clone of it
    ///
    /// Returns `true` only for the call that actually closed it.
    pub fn close(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::SeqCst);
        if first {
            debug!(address = %self.address, "RpcClient::close: closed");
        }
        first
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Check the node is alive and return its version
    pub async fn ping(&self) -> Result<String, RpcError> {
        match self.call(&RpcRequest::Ping).await? {
            RpcResponse::Pong { version } => Ok(version),
            other => Err(RpcError::unexpected("Ping", &other)),
        }
    }

    /// Ask the node to stop serving
    pub async fn shutdown(&self) -> Result<(), RpcError> {
        match self.call(&RpcRequest::Shutdown).await? {
            RpcResponse::Ok => Ok(()),
            other => Err(RpcError::unexpected("Shutdown", &other)),
        }
    }

    /// Send a request and wait for its response
    ///
    /// Transport failures are retried up to `retries` extra times. Error
    /// responses from the remote side are returned as-is and never retried.
    pub async fn call(&self, request: &RpcRequest) -> Result<RpcResponse, RpcError> {
        let mut attempt = 0;
        loop {
            if self.is_closed() {
                return Err(RpcError::Closed);
            }
            match self.call_once(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.config.retries => {
                    attempt += 1;
                    warn!(
                        address = %self.address,
                        request = request.name(),
                        attempt,
                        error = %e,
                        "RpcClient::call: transport failure, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn call_once(&self, request: &RpcRequest) -> Result<RpcResponse, RpcError> {
        debug!(address = %self.address, request = request.name(), "RpcClient::call_once: called");
        let timeout = self.config.timeout();
        let max = self.config.max_message_bytes;

        let stream = tokio::time::timeout(timeout, TcpStream::connect(&self.address))
            .await
            .map_err(|_| RpcError::Timeout("connect", timeout))??;
        stream.set_nodelay(true)?;
        let mut stream = BufReader::new(stream);

        tokio::time::timeout(timeout, write_frame(stream.get_mut(), request, max))
            .await
            .map_err(|_| RpcError::Timeout("write", timeout))??;

        let response: Option<RpcResponse> = tokio::time::timeout(timeout, read_frame(&mut stream, max))
            .await
            .map_err(|_| RpcError::Timeout("read", timeout))??;

        let response = response.ok_or(RpcError::Disconnected)?;
        debug!(address = %self.address, "RpcClient::call_once: received response");
        Ok(response)
    }
}
