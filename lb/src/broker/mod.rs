//! Broker - splits each turn into row bands and farms them out
//!
//! The broker is the only component that sees both the whole grid and the
//! worker pool. It owns:
//! - the worker registry, in band order
//! - the failure policy for bands that cannot be computed
//! - a mirror of the latest grid for alive-count queries

mod config;
mod core;
mod engine;
mod error;
mod registry;
mod service;

pub use config::{BrokerConfig, FailurePolicy};
pub use self::core::Broker;
pub use engine::{LocalEngine, RemoteBroker, TurnEngine};
pub use error::{BandError, BrokerError};
pub use registry::{BandWorker, LocalWorker, RemoteWorker, WorkerEntry};
pub use service::{BrokerService, bind_broker};
