//! Controller - runs the turn loop and answers to the operator
//!
//! A run reads its initial grid, then repeatedly asks a
//! [`TurnEngine`](crate::broker::TurnEngine) for the next generation while
//! command intake and the alive-count poller run alongside it.

mod commands;
mod config;
mod core;
mod poller;
mod state;

pub use commands::Command;
pub use config::{AliveSource, ControllerConfig, PausePath, TurnFailure};
pub use self::core::{Controller, RunOutcome, RunSummary};
pub use state::{InvalidTransition, RunPhase, RunState};
