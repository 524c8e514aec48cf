//! Request/response transport between nodes
//!
//! JSON-over-newline on TCP. The controller calls the broker, the broker
//! calls the workers; both servers share the same listener and message
//! vocabulary.

use std::time::Duration;

use thiserror::Error;

pub mod client;
pub mod config;
pub mod frame;
pub mod listener;
pub mod messages;

pub use client::RpcClient;
pub use config::RpcConfig;
pub use listener::{RpcHandler, RpcServer, ShutdownHandle};
pub use messages::{ErrorKind, RpcRequest, RpcResponse};

/// Version reported by every node in `Pong`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Transport-level failures
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("{0} timeout after {1:?}")]
    Timeout(&'static str, Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Message too large: {0} bytes")]
    TooLarge(usize),

    #[error("Connection closed by peer")]
    Disconnected,

    #[error("Client closed")]
    Closed,

    #[error("Unexpected response to {request}: {response}")]
    UnexpectedResponse { request: &'static str, response: String },
}

impl RpcError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(..) | Self::Io(_) | Self::Disconnected)
    }

    pub(crate) fn unexpected(request: &'static str, response: &RpcResponse) -> Self {
        Self::UnexpectedResponse {
            request,
            response: format!("{:?}", response),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(RpcError::Timeout("read", Duration::from_secs(1)).is_retryable());
        assert!(RpcError::Disconnected.is_retryable());
        assert!(RpcError::Io(std::io::Error::other("reset")).is_retryable());
        assert!(!RpcError::TooLarge(10).is_retryable());
        assert!(!RpcError::Closed.is_retryable());
    }

    #[test]
    fn test_unexpected_response_message() {
        let err = RpcError::unexpected("Ping", &RpcResponse::Ok);
        assert_eq!(err.to_string(), "Unexpected response to Ping: Ok");
    }
}
