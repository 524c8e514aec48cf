//! Controller configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where pause-toggle commands are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PausePath {
    /// Command intake flips the pause flag itself, even mid-turn
    #[default]
    Concurrent,
    /// Pause is queued for the turn loop like every other command
    TurnLoop,
}

/// Where the periodic alive count comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AliveSource {
    /// Ask the turn engine for its cached grid's count
    #[default]
    Engine,
    /// Count the controller's own committed grid
    Local,
}

/// What the run does after a failed turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TurnFailure {
    /// Tear down immediately and return the error
    Abort,
    /// Finalize with the last committed grid, then return the error
    #[default]
    Finalize,
}

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Broker address; without one the run uses in-process workers
    #[serde(default)]
    pub broker: Option<String>,

    /// In-process worker count when no broker address is set
    #[serde(default = "default_local_workers", rename = "local-workers")]
    pub local_workers: usize,

    #[serde(default = "default_width")]
    pub width: usize,

    #[serde(default = "default_height")]
    pub height: usize,

    /// Turns to run before finalizing
    #[serde(default = "default_turns")]
    pub turns: usize,

    #[serde(default = "default_alive_poll_ms", rename = "alive-poll-ms")]
    pub alive_poll_ms: u64,

    /// Idle between checks while paused
    #[serde(default = "default_pause_idle_ms", rename = "pause-idle-ms")]
    pub pause_idle_ms: u64,

    #[serde(default, rename = "pause-path")]
    pub pause_path: PausePath,

    #[serde(default, rename = "alive-source")]
    pub alive_source: AliveSource,

    #[serde(default, rename = "on-turn-failure")]
    pub on_turn_failure: TurnFailure,

    /// On shutdown, ask a remote broker to stop itself and its workers
    #[serde(default = "default_shutdown_broker", rename = "shutdown-broker")]
    pub shutdown_broker: bool,
}

fn default_local_workers() -> usize {
    debug!("default_local_workers: called");
    4
}

fn default_width() -> usize {
    debug!("default_width: called");
    64
}

fn default_height() -> usize {
    debug!("default_height: called");
    64
}

fn default_turns() -> usize {
    debug!("default_turns: called");
    100
}

fn default_alive_poll_ms() -> u64 {
    debug!("default_alive_poll_ms: called");
    2000
}

fn default_pause_idle_ms() -> u64 {
    debug!("default_pause_idle_ms: called");
    10
}

fn default_shutdown_broker() -> bool {
    debug!("default_shutdown_broker: called");
    true
}

impl Default for ControllerConfig {
    fn default() -> Self {
        debug!("ControllerConfig::default: called");
        Self {
            broker: None,
            local_workers: default_local_workers(),
            width: default_width(),
            height: default_height(),
            turns: default_turns(),
            alive_poll_ms: default_alive_poll_ms(),
            pause_idle_ms: default_pause_idle_ms(),
            pause_path: PausePath::default(),
            alive_source: AliveSource::default(),
            on_turn_failure: TurnFailure::default(),
            shutdown_broker: default_shutdown_broker(),
        }
    }
}

impl ControllerConfig {
    pub fn alive_poll_interval(&self) -> Duration {
        Duration::from_millis(self.alive_poll_ms)
    }

    pub fn pause_idle(&self) -> Duration {
        Duration::from_millis(self.pause_idle_ms)
    }
}
