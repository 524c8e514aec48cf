//! Broker error types

use thiserror::Error;

use crate::domain::GridError;
use crate::rpc::{ErrorKind, RpcError};

/// Why a single band could not be computed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BandError {
    #[error("transport error: {0}")]
    Transport(String),

    /// The worker rejected the task; retrying cannot help
    #[error("{0}")]
    InvalidTask(String),

    #[error("malformed reply: {0}")]
    Malformed(String),
}

impl BandError {
    pub fn is_invalid_task(&self) -> bool {
        matches!(self, Self::InvalidTask(_))
    }
}

/// Errors from advancing a turn or querying a broker
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("no workers available")]
    NoWorkers,

    #[error("invalid grid: {0}")]
    InvalidGrid(#[from] GridError),

    #[error("band {start_y}..{end_y} on worker {address} failed: {source}")]
    Band {
        start_y: usize,
        end_y: usize,
        address: String,
        #[source]
        source: BandError,
    },

    #[error("worker registration failed for {address}: {source}")]
    Registration {
        address: String,
        #[source]
        source: RpcError,
    },

    #[error("broker transport error: {0}")]
    Transport(#[from] RpcError),

    #[error("broker error ({kind:?}): {message}")]
    Remote { kind: ErrorKind, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl BrokerError {
    /// Wire classification for error responses
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoWorkers => ErrorKind::NoWorkers,
            Self::InvalidGrid(_) => ErrorKind::InvalidGrid,
            Self::Band { source, .. } if source.is_invalid_task() => ErrorKind::InvalidTask,
            Self::Band { .. } => ErrorKind::BandFailed,
            Self::Remote { kind, .. } => *kind,
            Self::Registration { .. } | Self::Transport(_) | Self::Internal(_) => ErrorKind::Transport,
        }
    }
}
