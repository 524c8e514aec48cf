//! Run events
//!
//! The controller reports everything observable about a run through an
//! [`EventEmitter`]; the driver reads the matching [`EventStream`] and may
//! persist it with an [`EventLogger`].
//!
//! ```text
//!   turn loop ──┐
//!   poller ─────┼──> EventEmitter ──> EventStream ──> printer / EventLogger (.jsonl)
//!   intake ─────┘
//! ```

mod emitter;
mod logger;
mod types;

pub use emitter::{EventEmitter, EventStream, create_event_channel};
pub use logger::EventLogger;
pub use types::{Event, EventLogEntry, State};
