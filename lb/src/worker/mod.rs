//! Stateless band worker
//!
//! Given one band plus its halo rows, computes the next-generation rows
//! for that band. Workers know nothing about each other or about the grid
//! as a whole.

mod compute;
mod service;

pub use compute::{TaskError, compute_band};
pub use service::{WorkerService, bind_worker};
