//! Operator commands and the task that takes them in

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use super::config::PausePath;
use super::core::{Shared, wait_stopped};

/// One operator input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    PauseToggle,
    Save,
    Quit,
    Shutdown,
    /// Anything else; ignored by the controller
    Other(char),
}

impl Command {
    /// `p` pause-toggle, `s` save, `q` quit, `k` shutdown
    pub fn from_char(c: char) -> Self {
        match c {
            'p' => Command::PauseToggle,
            's' => Command::Save,
            'q' => Command::Quit,
            'k' => Command::Shutdown,
            other => Command::Other(other),
        }
    }

    /// Commands typed on one input line, whitespace skipped
    pub fn parse_line(line: &str) -> Vec<Command> {
        line.chars().filter(|c| !c.is_whitespace()).map(Command::from_char).collect()
    }
}

/// Consume operator commands until the stream ends or the run stops
///
/// With [`PausePath::Concurrent`] pause-toggles are applied here, so they
/// take effect while the turn loop waits on the engine. Everything else is
/// queued for the turn loop; opaque inputs are dropped.
pub(super) async fn command_intake(
    shared: Arc<Shared>,
    mut commands: mpsc::Receiver<Command>,
    loop_tx: mpsc::UnboundedSender<Command>,
    pause_path: PausePath,
) {
    debug!(?pause_path, "command_intake: started");
    let mut stop_rx = shared.stop_tx.subscribe();
    loop {
        let command = tokio::select! {
            command = commands.recv() => match command {
                Some(command) => command,
                None => {
                    debug!("command_intake: command stream ended");
                    break;
                }
            },
            _ = wait_stopped(&mut stop_rx) => break,
        };
        debug!(?command, "command_intake: received");
        match command {
            Command::PauseToggle if pause_path == PausePath::Concurrent => shared.toggle_pause().await,
            Command::Other(c) => debug!(?c, "command_intake: ignoring input"),
            other => {
                if loop_tx.send(other).is_err() {
                    break;
                }
            }
        }
    }
    debug!("command_intake: stopped");
}
