//! Controller - owns the canonical grid and drives a run
//!
//! Three activities share one [`RunState`] lock:
//! - the turn loop, the only caller of `advance_turn`
//! - command intake, which may flip the pause flag mid-turn
//! - the alive-count poller
//!
//! The lock is never held across an engine call, and every per-turn event
//! is emitted under it so a concurrent pause report cannot split a turn's
//! events.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use eyre::{Context, Result};
use serde::Serialize;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::broker::{BrokerError, TurnEngine};
use crate::domain::Grid;
use crate::events::{EventEmitter, State};
use crate::snapshot::{CellSource, SnapshotSink, input_identifier, snapshot_identifier};

use super::commands::{Command, command_intake};
use super::config::{ControllerConfig, TurnFailure};
use super::poller::alive_poller;
use super::state::{RunPhase, RunState};

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    /// All configured turns ran
    Completed,
    Quit,
    Shutdown,
}

/// Result of a finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub turn: usize,
    pub alive: usize,
    pub phase: RunPhase,
    pub outcome: RunOutcome,
}

/// Why the turn loop returned
enum LoopExit {
    Completed,
    Quit,
    Shutdown,
    Failed(BrokerError),
}

/// State shared by the turn loop and its background tasks
pub(super) struct Shared {
    pub(super) state: Mutex<RunState>,
    pub(super) events: EventEmitter,
    pub(super) engine: Arc<dyn TurnEngine>,
    pub(super) stop_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    stopped: AtomicBool,
    engine_closed: AtomicBool,
}

impl Shared {
    /// Flip the pause flag and report the new state
    pub(super) async fn toggle_pause(&self) {
        let mut state = self.state.lock().await;
        match state.toggle_pause() {
            Ok(phase) => {
                info!(turn = state.turn, %phase, "Pause toggled");
                if let Some(reported) = phase.reported_state() {
                    self.events.state_change(state.turn, reported);
                }
            }
            Err(e) => debug!(error = %e, "toggle_pause: ignored"),
        }
    }

    /// Stop the poller and command intake; only the first call does anything
    async fn stop_background(&self) -> bool {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return false;
        }
        debug!("stop_background: stopping poller and intake");
        self.stop_tx.send_replace(true);
        let tasks: Vec<_> = self.tasks.lock().await.drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "stop_background: task ended abnormally");
            }
        }
        true
    }

    /// Release the engine; only the first call reaches it
    async fn close_engine(&self, shutdown_remote: bool) -> bool {
        if self.engine_closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        debug!(shutdown_remote, "close_engine: called");
        self.engine.close(shutdown_remote).await;
        true
    }

    /// Copy of the committed grid and its turn
    async fn snapshot(&self) -> (Grid, usize) {
        let state = self.state.lock().await;
        (state.grid.clone(), state.turn)
    }

    /// Enter Quitting and report it
    async fn enter_quitting(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.transition(RunPhase::Quitting)?;
        self.events.state_change(state.turn, State::Quitting);
        Ok(())
    }

    async fn terminate(&self) -> Result<(usize, usize, RunPhase)> {
        let mut state = self.state.lock().await;
        state.transition(RunPhase::Terminated)?;
        Ok((state.turn, state.grid.count_alive(), state.phase()))
    }
}

/// Resolves once the stop flag is set
pub(super) async fn wait_stopped(stop_rx: &mut watch::Receiver<bool>) {
    while !*stop_rx.borrow_and_update() {
        if stop_rx.changed().await.is_err() {
            return;
        }
    }
}

/// Drives one run against a turn engine
pub struct Controller {
    config: ControllerConfig,
    engine: Arc<dyn TurnEngine>,
    input: Arc<dyn CellSource>,
    output: Arc<dyn SnapshotSink>,
    events: EventEmitter,
    run_id: String,
}

impl Controller {
    pub fn new(
        config: ControllerConfig,
        engine: Arc<dyn TurnEngine>,
        input: Arc<dyn CellSource>,
        output: Arc<dyn SnapshotSink>,
        events: EventEmitter,
    ) -> Self {
        let run_id = Uuid::now_v7().to_string();
        debug!(%run_id, "Controller::new: called");
        Self {
            config,
            engine,
            input,
            output,
            events,
            run_id,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Run until the turns are exhausted, the operator quits or shuts down,
    /// or a turn fails
    pub async fn run(self, commands: mpsc::Receiver<Command>) -> Result<RunSummary> {
        let (width, height) = (self.config.width, self.config.height);
        info!(run_id = %self.run_id, width, height, turns = self.config.turns, "Run starting");

        let identifier = input_identifier(width, height);
        let cells = self
            .input
            .read_cells(&identifier, width, height)
            .await
            .context(format!("Failed to read initial grid {}", identifier))?;
        let grid = Grid::from_cells(width, height, cells).context("Initial grid has the wrong shape")?;
        let initially_alive = grid.alive_cells();

        let (stop_tx, _) = watch::channel(false);
        let shared = Arc::new(Shared {
            state: Mutex::new(RunState::new(grid)),
            events: self.events.clone(),
            engine: self.engine.clone(),
            stop_tx,
            tasks: Mutex::new(Vec::new()),
            stopped: AtomicBool::new(false),
            engine_closed: AtomicBool::new(false),
        });

        {
            let mut state = shared.state.lock().await;
            state.transition(RunPhase::Executing)?;
            self.events.state_change(0, State::Executing);
            self.events.cells_flipped(0, initially_alive);
            self.events.turn_complete(0);
        }

        let (loop_tx, mut loop_rx) = mpsc::unbounded_channel();
        {
            let mut tasks = shared.tasks.lock().await;
            tasks.push(tokio::spawn(command_intake(
                shared.clone(),
                commands,
                loop_tx,
                self.config.pause_path,
            )));
            tasks.push(tokio::spawn(alive_poller(
                shared.clone(),
                self.config.alive_poll_interval(),
                self.config.alive_source,
            )));
        }

        let exit = self.turn_loop(&shared, &mut loop_rx).await;
        let result = match exit {
            LoopExit::Completed => self.finish(&shared, RunOutcome::Completed).await,
            LoopExit::Quit => self.finish(&shared, RunOutcome::Quit).await,
            LoopExit::Shutdown => self.shutdown(&shared).await,
            LoopExit::Failed(e) => self.fail(&shared, e).await,
        };
        self.events.close();
        result
    }

    async fn turn_loop(&self, shared: &Shared, loop_rx: &mut mpsc::UnboundedReceiver<Command>) -> LoopExit {
        loop {
            while let Ok(command) = loop_rx.try_recv() {
                match command {
                    Command::PauseToggle => shared.toggle_pause().await,
                    Command::Save => {
                        if let Err(e) = self.save(shared).await {
                            warn!(error = %e, "turn_loop: save failed");
                        }
                    }
                    Command::Quit => return LoopExit::Quit,
                    Command::Shutdown => return LoopExit::Shutdown,
                    Command::Other(_) => {}
                }
            }

            let (grid, turn, paused) = {
                let state = shared.state.lock().await;
                (state.grid.clone(), state.turn, state.is_paused())
            };
            if turn >= self.config.turns {
                return LoopExit::Completed;
            }
            if paused {
                tokio::time::sleep(self.config.pause_idle()).await;
                continue;
            }

            debug!(turn, "turn_loop: advancing");
            match self.engine.advance_turn(grid).await {
                Ok(next) => {
                    let mut state = shared.state.lock().await;
                    match state.commit(next) {
                        Ok(flipped) => {
                            self.events.cells_flipped(state.turn, flipped);
                            self.events.turn_complete(state.turn);
                        }
                        Err(e) => {
                            error!(turn, error = %e, "Engine returned a grid of the wrong shape");
                            return LoopExit::Failed(BrokerError::InvalidGrid(e));
                        }
                    }
                }
                Err(e) => {
                    error!(turn, error = %e, "Turn failed");
                    return LoopExit::Failed(e);
                }
            }
        }
    }

    /// Persist the committed grid and report it once the sink is idle
    async fn save(&self, shared: &Shared) -> Result<String> {
        let (grid, turn) = shared.snapshot().await;
        let identifier = snapshot_identifier(grid.width(), grid.height(), turn);
        self.output.write(&identifier, grid).await?;
        self.output.wait_idle().await?;
        info!(turn, %identifier, "Snapshot saved");
        self.events.output_complete(turn, identifier.clone());
        Ok(identifier)
    }

    /// Final report, final snapshot, Quitting
    async fn finalize(&self, shared: &Shared) -> Result<()> {
        shared.stop_background().await;
        let (grid, turn) = shared.snapshot().await;
        self.events.final_turn_complete(turn, grid.alive_cells());
        let saved = self.save(shared).await;
        shared.enter_quitting().await?;
        shared.close_engine(false).await;
        saved.map(|_| ())
    }

    async fn finish(&self, shared: &Shared, outcome: RunOutcome) -> Result<RunSummary> {
        self.finalize(shared).await?;
        let summary = self.summary(shared, outcome).await?;
        info!(run_id = %self.run_id, turn = summary.turn, alive = summary.alive, ?outcome, "Run finished");
        Ok(summary)
    }

    /// Save, release the engine, wait for output, Quitting; no final report
    async fn shutdown(&self, shared: &Shared) -> Result<RunSummary> {
        info!(run_id = %self.run_id, "Shutdown requested");
        shared.stop_background().await;
        let (grid, turn) = shared.snapshot().await;
        let identifier = snapshot_identifier(grid.width(), grid.height(), turn);
        let written = self.output.write(&identifier, grid).await;
        shared.close_engine(self.config.shutdown_broker).await;
        written?;
        self.output.wait_idle().await?;
        self.events.output_complete(turn, identifier);
        shared.enter_quitting().await?;
        self.summary(shared, RunOutcome::Shutdown).await
    }

    async fn fail(&self, shared: &Shared, e: BrokerError) -> Result<RunSummary> {
        let turn = shared.state.lock().await.turn;
        match self.config.on_turn_failure {
            TurnFailure::Abort => {
                shared.stop_background().await;
                shared.close_engine(false).await;
            }
            TurnFailure::Finalize => {
                if let Err(fe) = self.finalize(shared).await {
                    warn!(error = %fe, "fail: finalization after failed turn also failed");
                }
            }
        }
        Err(eyre::Report::new(e).wrap_err(format!("Turn {} failed", turn + 1)))
    }

    async fn summary(&self, shared: &Shared, outcome: RunOutcome) -> Result<RunSummary> {
        let (turn, alive, phase) = shared.terminate().await?;
        Ok(RunSummary {
            run_id: self.run_id.clone(),
            turn,
            alive,
            phase,
            outcome,
        })
    }
}
