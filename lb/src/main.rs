//! lb - distributed Game of Life
//!
//! CLI entry point for workers, brokers and runs.

use std::fs;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use lifebroker::broker::{Broker, BrokerConfig, LocalWorker, RemoteBroker, TurnEngine, bind_broker};
use lifebroker::cli::{Cli, Command};
use lifebroker::config::{Config, resolve_log_level};
use lifebroker::controller::{Command as RunCommand, Controller, ControllerConfig};
use lifebroker::events::{Event, EventLogger, EventStream, State, create_event_channel};
use lifebroker::rpc::{RpcClient, RpcServer};
use lifebroker::snapshot::{RandomInput, TextDirOutput};
use lifebroker::worker::bind_worker;

fn setup_logging(level: &str, name: &str) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lifebroker")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Write to a log file, not stdout/stderr. Workers, brokers and runs on one
    // host each get their own file, and every process appends.
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(format!("lifebroker-{}.log", name)))
        .context("Failed to open log file")?;
    let filter = tracing_subscriber::EnvFilter::try_new(level).context(format!("Invalid log level '{}'", level))?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(filter)
        .init();

    info!(pid = std::process::id(), "Logging initialized (level: {})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Log level comes from the config file early, so the full load below is logged
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    let level = resolve_log_level(cli.log_level.as_deref(), config_log_level.as_deref());
    setup_logging(&level, cli.command.log_name()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Worker { listen } => cmd_worker(&config, listen).await,
        Command::Broker {
            listen,
            workers,
            failure_policy,
        } => {
            let mut broker = config.broker.clone();
            if let Some(listen) = listen {
                broker.listen = listen;
            }
            if !workers.is_empty() {
                broker.workers = workers;
            }
            if let Some(policy) = failure_policy {
                broker.failure_policy = policy;
            }
            cmd_broker(&config, broker).await
        }
        Command::Register { broker, worker } => cmd_register(&config, &broker, &worker).await,
        Command::Run {
            broker,
            local_workers,
            width,
            height,
            turns,
            seed,
            density,
            events_log,
            out_dir,
        } => {
            let mut run = config.controller.clone();
            if broker.is_some() {
                run.broker = broker;
            }
            if let Some(n) = local_workers {
                run.broker = None;
                run.local_workers = n;
            }
            run.width = width.unwrap_or(run.width);
            run.height = height.unwrap_or(run.height);
            run.turns = turns.unwrap_or(run.turns);
            cmd_run(&config, run, seed, density, events_log, out_dir).await
        }
        Command::Ping { address } => cmd_ping(&config, &address).await,
    }
}

async fn cmd_worker(config: &Config, listen: Option<String>) -> Result<()> {
    let listen = listen.unwrap_or_else(|| config.worker.listen.clone());
    let server = bind_worker(&listen, config.rpc.clone()).await?;
    println!("Worker listening on {}", server.local_addr()?);
    serve_until_stopped(server).await
}

async fn cmd_broker(config: &Config, broker: BrokerConfig) -> Result<()> {
    let (core, server) = bind_broker(&broker, config.rpc.clone()).await?;
    println!(
        "Broker listening on {} with {} worker(s), policy {}",
        server.local_addr()?,
        core.worker_count().await,
        broker.failure_policy
    );
    serve_until_stopped(server).await
}

/// Run the server until it stops by itself or Ctrl-C arrives
async fn serve_until_stopped(server: RpcServer) -> Result<()> {
    let handle = server.shutdown_handle();
    let mut task = tokio::spawn(server.run());
    tokio::select! {
        result = &mut task => return result.context("Server task panicked")?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("Ctrl-C received, shutting down");
            handle.shutdown();
        }
    }
    task.await.context("Server task panicked")?
}

async fn cmd_register(config: &Config, broker: &str, worker: &str) -> Result<()> {
    let remote = RemoteBroker::new(broker, config.rpc.clone());
    remote
        .register_worker(worker)
        .await
        .context(format!("Failed to register {} with {}", worker, broker))?;
    println!("Registered {} with {}", worker, broker);
    Ok(())
}

async fn cmd_ping(config: &Config, address: &str) -> Result<()> {
    let client = RpcClient::new(address, config.rpc.clone());
    let version = client.ping().await.context(format!("No answer from {}", address))?;
    println!("{}: lifebroker {}", address, version);
    Ok(())
}

async fn cmd_run(
    config: &Config,
    run: ControllerConfig,
    seed: u64,
    density: f64,
    events_log: Option<PathBuf>,
    out_dir: PathBuf,
) -> Result<()> {
    let engine: Arc<dyn TurnEngine> = match &run.broker {
        Some(address) => {
            let remote = RemoteBroker::new(address.clone(), config.rpc.clone());
            let version = remote.ping().await.context(format!("Broker {} is not answering", address))?;
            info!(%address, %version, "Connected to broker");
            Arc::new(remote)
        }
        None => {
            let broker = Broker::new(config.broker.failure_policy, config.rpc.clone());
            for i in 0..run.local_workers {
                broker.register(Arc::new(LocalWorker::new(format!("local-{}", i)))).await;
            }
            Arc::new(broker)
        }
    };

    let input = Arc::new(RandomInput::new(seed, density)?);
    let output = Arc::new(TextDirOutput::new(&out_dir)?);
    let (emitter, stream) = create_event_channel();
    let controller = Controller::new(run, engine, input, output, emitter);

    let logger = match events_log {
        Some(path) => Some(EventLogger::create(path, controller.run_id())?),
        None => None,
    };
    let printer = tokio::spawn(print_events(stream, logger));

    let (command_tx, command_rx) = mpsc::channel(16);
    spawn_command_reader(command_tx);

    let result = controller.run(command_rx).await;
    if let Err(e) = printer.await {
        warn!(error = %e, "Event printer ended abnormally");
    }

    match result {
        Ok(summary) => {
            println!(
                "{} run {} finished after {} turns with {} cells alive ({:?})",
                "done".green().bold(),
                summary.run_id,
                summary.turn,
                summary.alive,
                summary.outcome
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Run failed");
            Err(e)
        }
    }
}

/// Forward stdin lines as operator commands until EOF
///
/// Reads on a plain thread: a blocked stdin read must not hold up runtime
/// shutdown once the run is over.
fn spawn_command_reader(tx: mpsc::Sender<RunCommand>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "command reader: stdin error");
                    return;
                }
            };
            for command in RunCommand::parse_line(&line) {
                if tx.blocking_send(command).is_err() {
                    return;
                }
            }
        }
    });
}

async fn print_events(mut stream: EventStream, mut logger: Option<EventLogger>) {
    while let Some(event) = stream.recv().await {
        if let Some(logger) = logger.as_mut()
            && let Err(e) = logger.write_event(&event)
        {
            warn!(error = %e, path = ?logger.path(), "print_events: failed to log event");
        }
        match &event {
            Event::StateChange { state, .. } => {
                let line = event.to_string();
                let line = match state {
                    State::Executing => line.green(),
                    State::Paused => line.yellow(),
                    State::Quitting => line.red(),
                };
                println!("{}", line);
            }
            Event::AliveCellsCount { .. } | Event::FinalTurnComplete { .. } => println!("{}", event),
            Event::ImageOutputComplete { .. } => println!("{}", event.to_string().cyan()),
            Event::CellsFlipped { .. } | Event::TurnComplete { .. } => {}
        }
    }
}
