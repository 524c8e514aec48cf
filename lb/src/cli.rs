//! CLI command definitions and subcommands

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::broker::FailurePolicy;

/// lifebroker - distributed Game of Life
#[derive(Parser, Debug)]
#[command(
    name = "lb",
    about = "Distributed toroidal Game of Life: band workers, a fan-out broker and a turn controller",
    version = env!("CARGO_PKG_VERSION"),
    after_help = "Logs are appended to: ~/.local/share/lifebroker/logs/lifebroker-<command>.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Tracing level (overrides the config file)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve band computations
    Worker {
        /// Address to listen on
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Serve turns by fanning bands out to workers
    Broker {
        /// Address to listen on
        #[arg(short, long)]
        listen: Option<String>,

        /// Worker to register at start-up, in band order (repeatable)
        #[arg(short, long = "worker", value_name = "ADDR")]
        workers: Vec<String>,

        /// fail-fast, best-effort or retry:N
        #[arg(long)]
        failure_policy: Option<FailurePolicy>,
    },

    /// Ask a broker to add a worker to its pool
    Register {
        /// Broker address
        #[arg(short, long)]
        broker: String,

        /// Worker address
        worker: String,
    },

    /// Drive a run; commands are read from stdin (p pause, s save, q quit, k shutdown)
    Run {
        /// Broker address
        #[arg(short, long, conflicts_with = "local_workers")]
        broker: Option<String>,

        /// Run with this many in-process workers instead of a broker
        #[arg(long)]
        local_workers: Option<usize>,

        #[arg(long)]
        width: Option<usize>,

        #[arg(long)]
        height: Option<usize>,

        /// Turns to run
        #[arg(short, long)]
        turns: Option<usize>,

        /// Seed for the random initial grid
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Fraction of cells initially alive
        #[arg(long, default_value = "0.25")]
        density: f64,

        /// Append every event to this JSONL file
        #[arg(long, value_name = "PATH")]
        events_log: Option<PathBuf>,

        /// Write snapshots as text files into this directory
        #[arg(long, value_name = "DIR", default_value = "out")]
        out_dir: PathBuf,
    },

    /// Check that a worker or broker answers
    Ping {
        /// Node address
        address: String,
    },
}

impl Command {
    /// Name used for this command's log file
    pub fn log_name(&self) -> &'static str {
        match self {
            Command::Worker { .. } => "worker",
            Command::Broker { .. } => "broker",
            Command::Register { .. } => "register",
            Command::Run { .. } => "run",
            Command::Ping { .. } => "ping",
        }
    }
}
