//! Event types observed by whoever drives a run
//!
//! Per turn the controller emits, in order:
//! - `StateChange` when the run state changed
//! - `CellsFlipped` when at least one cell changed
//! - `TurnComplete`

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Cell;

/// Run state as reported to observers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    Executing,
    Paused,
    Quitting,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Executing => write!(f, "Executing"),
            State::Paused => write!(f, "Paused"),
            State::Quitting => write!(f, "Quitting"),
        }
    }
}

/// Everything a run reports
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The run entered a new state
    StateChange { turn: usize, state: State },
    /// Cells whose state differs from the previous turn
    CellsFlipped { turn: usize, cells: Vec<Cell> },
    /// A turn was committed
    TurnComplete { turn: usize },
    /// Periodic live-cell report
    AliveCellsCount { turn: usize, count: usize },
    /// A snapshot was persisted under `filename`
    ImageOutputComplete { turn: usize, filename: String },
    /// The run finished with these cells alive
    FinalTurnComplete { turn: usize, alive: Vec<Cell> },
}

impl Event {
    /// Turn number carried by every event
    pub fn turn(&self) -> usize {
        match self {
            Event::StateChange { turn, .. }
            | Event::CellsFlipped { turn, .. }
            | Event::TurnComplete { turn }
            | Event::AliveCellsCount { turn, .. }
            | Event::ImageOutputComplete { turn, .. }
            | Event::FinalTurnComplete { turn, .. } => *turn,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Event::StateChange { .. } => "StateChange",
            Event::CellsFlipped { .. } => "CellsFlipped",
            Event::TurnComplete { .. } => "TurnComplete",
            Event::AliveCellsCount { .. } => "AliveCellsCount",
            Event::ImageOutputComplete { .. } => "ImageOutputComplete",
            Event::FinalTurnComplete { .. } => "FinalTurnComplete",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::StateChange { turn, state } => write!(f, "Completed Turns {:<8} {}", turn, state),
            Event::CellsFlipped { turn, cells } => write!(f, "Completed Turns {:<8} {} cells flipped", turn, cells.len()),
            Event::TurnComplete { turn } => write!(f, "Completed Turns {:<8} turn complete", turn),
            Event::AliveCellsCount { turn, count } => write!(f, "Completed Turns {:<8} Alive Cells {}", turn, count),
            Event::ImageOutputComplete { turn, filename } => {
                write!(f, "Completed Turns {:<8} File {} output complete", turn, filename)
            }
            Event::FinalTurnComplete { turn, alive } => {
                write!(f, "Completed Turns {:<8} final turn, {} cells alive", turn, alive.len())
            }
        }
    }
}

/// A timestamped event log entry for file persistence
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventLogEntry {
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    pub run_id: String,
    pub event: Event,
}

impl EventLogEntry {
    pub fn new(run_id: impl Into<String>, event: Event) -> Self {
        Self {
            timestamp: Utc::now(),
            run_id: run_id.into(),
            event,
        }
    }
}
