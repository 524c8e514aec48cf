//! Event emitter - the sending half of a run's event stream
//!
//! Unlike a broadcast bus the stream is lossless: observers must see every
//! turn's events in order, so the channel is unbounded. The stream ends once
//! every emitter has been dropped; `close` stops delivery earlier.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::Cell;

use super::types::{Event, State};

/// Receiving half of a run's event stream
pub type EventStream = mpsc::UnboundedReceiver<Event>;

/// Create a connected emitter and stream
pub fn create_event_channel() -> (EventEmitter, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        EventEmitter {
            tx,
            closed: Arc::new(AtomicBool::new(false)),
        },
        rx,
    )
}

/// Cheap-to-clone handle for emitting run events
#[derive(Clone, Debug)]
pub struct EventEmitter {
    tx: mpsc::UnboundedSender<Event>,
    closed: Arc<AtomicBool>,
}

impl EventEmitter {
    pub fn emit(&self, event: Event) {
        if self.is_closed() {
            debug!(event_type = event.event_type(), "EventEmitter::emit: closed, dropping event");
            return;
        }
        debug!(event_type = event.event_type(), turn = event.turn(), "EventEmitter::emit");
        // A dropped receiver means nobody is watching
        let _ = self.tx.send(event);
    }

    /// Stop delivering events from this emitter and all its clones
    ///
    /// Returns `true` only for the call that actually closed the stream.
    pub fn close(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::SeqCst);
        if first {
            debug!("EventEmitter::close: event stream closed");
        }
        first
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    // === Convenience methods ===

    pub fn state_change(&self, turn: usize, state: State) {
        self.emit(Event::StateChange { turn, state });
    }

    /// Emit a cells-flipped event; nothing is sent for an empty set
    pub fn cells_flipped(&self, turn: usize, cells: Vec<Cell>) {
        if cells.is_empty() {
            return;
        }
        self.emit(Event::CellsFlipped { turn, cells });
    }

    pub fn turn_complete(&self, turn: usize) {
        self.emit(Event::TurnComplete { turn });
    }

    pub fn alive_count(&self, turn: usize, count: usize) {
        self.emit(Event::AliveCellsCount { turn, count });
    }

    pub fn output_complete(&self, turn: usize, filename: impl Into<String>) {
        self.emit(Event::ImageOutputComplete {
            turn,
            filename: filename.into(),
        });
    }

    pub fn final_turn_complete(&self, turn: usize, alive: Vec<Cell>) {
        self.emit(Event::FinalTurnComplete { turn, alive });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (emitter, mut stream) = create_event_channel();
        emitter.state_change(0, State::Executing);
        emitter.cells_flipped(0, vec![Cell::new(1, 1)]);
        emitter.turn_complete(0);
        drop(emitter);

        let mut types = Vec::new();
        while let Some(event) = stream.recv().await {
            types.push(event.event_type());
        }
        assert_eq!(types, vec!["StateChange", "CellsFlipped", "TurnComplete"]);
    }

    #[test]
    fn test_empty_flip_set_is_not_sent() {
        let (emitter, mut stream) = create_event_channel();
        emitter.cells_flipped(3, Vec::new());
        assert!(stream.try_recv().is_err());
    }

    #[test]
    fn test_close_is_single_fire() {
        let (emitter, mut stream) = create_event_channel();
        let clone = emitter.clone();
        assert!(emitter.close());
        assert!(!clone.close());
        clone.turn_complete(1);
        assert!(stream.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stream_ends_when_emitters_drop() {
        let (emitter, mut stream) = create_event_channel();
        let clone = emitter.clone();
        drop(emitter);
        clone.alive_count(2, 5);
        drop(clone);
        assert_eq!(stream.recv().await, Some(Event::AliveCellsCount { turn: 2, count: 5 }));
        assert_eq!(stream.recv().await, None);
    }

    #[test]
    fn test_emit_without_receiver_is_ok() {
        let (emitter, stream) = create_event_channel();
        drop(stream);
        emitter.turn_complete(0);
    }
}
