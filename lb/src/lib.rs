//! lifebroker - distributed toroidal Game of Life
//!
//! A controller drives a run turn by turn. Each turn goes to a broker,
//! which cuts the grid into contiguous row bands, sends each band plus its
//! two halo rows to a stateless worker, and merges the results.
//!
//! # Core Concepts
//!
//! - **Toroidal bands**: halo rows wrap top-to-bottom, cells wrap left-to-right
//! - **Barrier per turn**: every band finishes before the turn is returned
//! - **Responsive control**: pause, save, quit and shutdown are honoured while a turn is in flight
//!
//! # Modules
//!
//! - [`domain`] - Grid, cells, bands and tasks
//! - [`worker`] - Band computation and the worker service
//! - [`broker`] - Worker registry, fan-out/fan-in and turn engines
//! - [`rpc`] - JSON-over-newline transport
//! - [`controller`] - Turn loop, command intake and alive-count poller
//! - [`events`] - Run events and their JSONL log
//! - [`snapshot`] - Input and output collaborators
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod broker;
pub mod cli;
pub mod config;
pub mod controller;
pub mod domain;
pub mod events;
pub mod rpc;
pub mod snapshot;
pub mod worker;

pub use broker::{Broker, BrokerError, FailurePolicy, TurnEngine};
pub use controller::{Command, Controller, ControllerConfig, RunSummary};
pub use domain::{Band, Cell, Grid, Task};
pub use events::{Event, State};
