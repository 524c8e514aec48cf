//! Run state guarded by the controller's single lock

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Cell, Grid, GridError};
use crate::events::State;

/// Run lifecycle: `Initializing -> Executing <-> Paused -> Quitting -> Terminated`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Initializing,
    Executing,
    Paused,
    Quitting,
    Terminated,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("invalid run transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: RunPhase,
    pub to: RunPhase,
}

impl RunPhase {
    pub fn can_transition_to(self, to: RunPhase) -> bool {
        use RunPhase::*;
        matches!(
            (self, to),
            (Initializing, Executing)
                | (Executing, Paused)
                | (Paused, Executing)
                | (Initializing | Executing | Paused, Quitting)
                | (Quitting, Terminated)
        )
    }

    /// Event state reported for this phase, if observers see it
    pub fn reported_state(self) -> Option<State> {
        match self {
            RunPhase::Executing => Some(State::Executing),
            RunPhase::Paused => Some(State::Paused),
            RunPhase::Quitting => Some(State::Quitting),
            RunPhase::Initializing | RunPhase::Terminated => None,
        }
    }

    pub fn is_finished(self) -> bool {
        matches!(self, RunPhase::Quitting | RunPhase::Terminated)
    }
}

/// Canonical grid, turn counter and phase of one run
#[derive(Debug, Clone)]
pub struct RunState {
    pub grid: Grid,
    pub turn: usize,
    phase: RunPhase,
}

impl RunState {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            turn: 0,
            phase: RunPhase::Initializing,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn is_paused(&self) -> bool {
        self.phase == RunPhase::Paused
    }

    pub fn transition(&mut self, to: RunPhase) -> Result<(), InvalidTransition> {
        if !self.phase.can_transition_to(to) {
            return Err(InvalidTransition { from: self.phase, to });
        }
        self.phase = to;
        Ok(())
    }

    /// Flip between Executing and Paused, returning the new phase
    pub fn toggle_pause(&mut self) -> Result<RunPhase, InvalidTransition> {
        let to = match self.phase {
            RunPhase::Paused => RunPhase::Executing,
            _ => RunPhase::Paused,
        };
        self.transition(to)?;
        Ok(to)
    }

    /// Replace the grid with `next`, bump the turn and return the flipped cells
    ///
    /// A `next` of another shape is refused and leaves the state untouched.
    pub fn commit(&mut self, next: Grid) -> Result<Vec<Cell>, GridError> {
        next.ensure_shape(self.grid.width(), self.grid.height())?;
        let flipped = self.grid.diff(&next);
        self.grid = next;
        self.turn += 1;
        Ok(flipped)
    }
}
