//! RPC message types shared by workers, the broker and the controller
//!
//! Simple JSON-over-newline protocol. Each message is a single line of JSON followed by `\n`.

use serde::{Deserialize, Serialize};

use crate::domain::{Row, Task, rows_codec};

/// Requests sent to a worker or the broker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RpcRequest {
    /// Worker: compute one band
    ComputeBand { task: Task },

    /// Broker: advance the full grid by one turn
    AdvanceTurn {
        width: usize,
        height: usize,
        #[serde(with = "rows_codec")]
        rows: Vec<Row>,
    },

    /// Broker: live cells in the cached grid
    AliveCount,

    /// Broker: append a worker to the registry
    RegisterWorker { address: String },

    /// Ping to check if the node is alive
    Ping,

    /// Request the node to stop gracefully
    Shutdown,
}

impl RpcRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ComputeBand { .. } => "ComputeBand",
            Self::AdvanceTurn { .. } => "AdvanceTurn",
            Self::AliveCount => "AliveCount",
            Self::RegisterWorker { .. } => "RegisterWorker",
            Self::Ping => "Ping",
            Self::Shutdown => "Shutdown",
        }
    }
}

/// Classification carried by error responses
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidTask,
    NoWorkers,
    InvalidGrid,
    BandFailed,
    Unsupported,
    Transport,
}

/// Responses from a worker or the broker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RpcResponse {
    /// Computed band rows
    Rows {
        #[serde(with = "rows_codec")]
        rows: Vec<Row>,
    },

    /// A full grid
    Grid {
        width: usize,
        height: usize,
        #[serde(with = "rows_codec")]
        rows: Vec<Row>,
    },

    /// Live cell count
    AliveCount { count: usize },

    /// Acknowledgment
    Ok,

    /// Pong response to ping
    Pong { version: String },

    /// Error response
    Error { kind: ErrorKind, message: String },
}

impl RpcResponse {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            kind,
            message: message.into(),
        }
    }
}
