//! RPC listener for the serving side
//!
//! Accepts TCP connections and feeds each request line to an [`RpcHandler`].
//! A connection may carry any number of request/response pairs.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use eyre::{Context, Result};
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::config::RpcConfig;
use super::frame::{read_frame, write_frame};
use super::messages::{ErrorKind, RpcRequest, RpcResponse};
use super::{RpcError, VERSION};

/// Service logic behind a listener
///
/// `Ping` and `Shutdown` are answered by the listener itself; every other
/// request reaches `handle`.
#[async_trait]
pub trait RpcHandler: Send + Sync + 'static {
    async fn handle(&self, request: RpcRequest) -> RpcResponse;

    /// Called once after the listener stops accepting connections
    async fn on_shutdown(&self) {}
}

/// Handle used to stop a running [`RpcServer`] from outside
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        debug!("ShutdownHandle::shutdown: called");
        self.tx.send_replace(true);
    }
}

/// A bound listener plus the handler it serves
pub struct RpcServer {
    listener: TcpListener,
    handler: Arc<dyn RpcHandler>,
    config: RpcConfig,
    stop_tx: Arc<watch::Sender<bool>>,
}

impl RpcServer {
    /// Bind a listener on `address` (use port 0 for an ephemeral port)
    pub async fn bind(address: &str, handler: Arc<dyn RpcHandler>, config: RpcConfig) -> Result<Self> {
        debug!(%address, "RpcServer::bind: called");
        let listener = TcpListener::bind(address)
            .await
            .context(format!("Failed to bind RPC listener on {}", address))?;
        let (stop_tx, _) = watch::channel(false);
        Ok(Self {
            listener,
            handler,
            config,
            stop_tx: Arc::new(stop_tx),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().context("Failed to read listener address")
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.stop_tx.clone(),
        }
    }

    /// Serve until a `Shutdown` request arrives or the handle fires
    pub async fn run(self) -> Result<()> {
        let addr = self.local_addr()?;
        info!(%addr, "RPC server listening");
        let mut stop_rx = self.stop_tx.subscribe();

        loop {
            if *stop_rx.borrow_and_update() {
                break;
            }
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!(%peer, "run: connection accepted");
                            let handler = self.handler.clone();
                            let config = self.config.clone();
                            let stop_tx = self.stop_tx.clone();
                            tokio::spawn(async move {
                                if let Err(e) = serve_connection(stream, handler, config, stop_tx).await {
                                    warn!(%peer, error = %e, "run: connection error");
                                }
                            });
                        }
                        Err(e) => {
                            warn!(error = %e, "run: accept error");
                        }
                    }
                }
                _ = stop_rx.changed() => {
                    debug!("run: stop signal received");
                }
            }
        }

        info!(%addr, "RPC server stopping");
        self.handler.on_shutdown().await;
        Ok(())
    }
}

async fn serve_connection(
    stream: TcpStream,
    handler: Arc<dyn RpcHandler>,
    config: RpcConfig,
    stop_tx: Arc<watch::Sender<bool>>,
) -> Result<(), RpcError> {
    stream.set_nodelay(true)?;
    let mut stream = BufReader::new(stream);
    let max = config.max_message_bytes;

    loop {
        let request: RpcRequest = match read_frame(&mut stream, max).await {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(()),
            Err(RpcError::Codec(e)) => {
                let response = RpcResponse::error(ErrorKind::Unsupported, format!("Failed to parse request: {}", e));
                write_frame(stream.get_mut(), &response, max).await?;
                continue;
            }
            Err(e) => return Err(e),
        };
        debug!(request = request.name(), "serve_connection: received request");

        let response = match request {
            RpcRequest::Ping => RpcResponse::Pong {
                version: VERSION.to_string(),
            },
            RpcRequest::Shutdown => {
                write_frame(stream.get_mut(), &RpcResponse::Ok, max).await?;
                stop_tx.send_replace(true);
                return Ok(());
            }
            other => handler.handle(other).await,
        };
        write_frame(stream.get_mut(), &response, max).await?;
    }
}
