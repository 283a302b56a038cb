mod cli;
mod command;
mod config;
mod controller;
mod demo;
mod error;
mod executor;
mod learning_mode;
mod liveness;
mod node;
mod pause;
mod readiness;
mod sim;
mod state_machine;
mod status;
mod transport;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use config::CommanderConfig;
use liveness::{BroadcastPublisher, spawn_liveness};
use node::CommanderNode;
use transport::Outbound;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => CommanderConfig::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => CommanderConfig::load()?,
    };
    cli.apply_overrides(&mut config);
    config.validate()?;

    match cli.command {
        Command::Run => run(config).await,
        Command::Demo => Ok(demo::run(config).await?),
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Serve JSON lines from stdin until EOF or Ctrl-C.
async fn run(config: CommanderConfig) -> Result<()> {
    let controller = sim::simulated_controller(&config);

    let publisher = BroadcastPublisher::new(16);
    let mut activity = publisher.subscribe();
    let liveness = spawn_liveness(
        controller.clone(),
        publisher,
        config.active_publish_interval(),
    );
    let activity_log = tokio::spawn(async move {
        while let Ok(active) = activity.recv().await {
            debug!(active, "goal activity");
        }
    });

    let (node, handle) = CommanderNode::new(controller, 64);
    let (shutdown, shutdown_rx) = watch::channel(false);
    let node_task = tokio::spawn(node.run(shutdown_rx));

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Outbound>();
    let printer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(msg) = out_rx.recv().await {
            let Ok(mut line) = serde_json::to_string(&msg) else {
                continue;
            };
            line.push('\n');
            if stdout.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    info!("reading commands from stdin");
    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        served = transport::serve_lines(handle, stdin, out_tx) => served?,
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }

    let _ = shutdown.send(true);
    let _ = node_task.await;
    liveness.abort();
    activity_log.abort();
    // Remaining senders live in goal tasks; their results still get printed.
    let _ = printer.await;
    Ok(())
}
