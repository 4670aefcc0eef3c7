mod cli;
mod shutdown;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pakbroker_core::config::{self, BrokerConfig};
use pakbroker_core::{ExitStatus, tid};
use pakbroker_engine::{
    BackendEngine, EngineConfig, EngineEvent, ListConfig, PluginCatalog, TransactionList,
};

use crate::cli::{Cli, RoleCommand};
use crate::shutdown::{CancelSignal, spawn_ctrl_c_handler};

fn render_event(event: &EngineEvent) -> String {
    match event {
        EngineEvent::JobStatusChanged { status } => format!("status: {status}"),
        EngineEvent::PercentageChanged { percentage } => format!("percentage: {percentage}%"),
        EngineEvent::SubPercentageChanged { percentage } => {
            format!("sub-percentage: {percentage}%")
        }
        EngineEvent::NoPercentageUpdates => "no percentage updates for this job".to_string(),
        EngineEvent::AllowInterruptChanged { allow } => format!("interruptible: {allow}"),
        EngineEvent::Package {
            info,
            package_id,
            summary,
        } => format!("package ({info}) {package_id}: {summary}"),
        EngineEvent::Description {
            package_id,
            licence,
            group,
            detail,
            url,
        } => format!("description {package_id} [{licence}, {group}] {detail} <{url}>"),
        EngineEvent::UpdateDetail {
            package_id,
            restart,
            update_text,
            ..
        } => format!("update-detail {package_id} (restart: {restart}): {update_text}"),
        EngineEvent::RequireRestart { kind, detail } => {
            format!("restart required ({kind}): {detail}")
        }
        EngineEvent::ErrorCode { code, message } => format!("error: {code}: {message}"),
        EngineEvent::Finished { exit } => format!("finished: {exit}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let file_config = match config::load_config() {
        Ok(Some(cfg)) => cfg,
        Ok(None) => BrokerConfig::default(),
        Err(err) => {
            eprintln!("warning: failed to read config (using defaults): {err:#}");
            BrokerConfig::default()
        }
    };
    let backend = cli.backend.clone().unwrap_or(file_config.backend);
    let helper_root = cli.helper_root.clone().unwrap_or(file_config.helper_root);

    let catalog = Arc::new(PluginCatalog::builtin());
    let engine_config = EngineConfig::new(helper_root);

    if matches!(&cli.command, RoleCommand::Actions) {
        let engine = BackendEngine::load(&catalog, &backend, engine_config)
            .with_context(|| format!("cannot load plugin '{backend}'"))?;
        for action in engine.actions() {
            println!("{action}");
        }
        return Ok(());
    }

    // Fail early on a bad plugin name instead of per transaction.
    catalog
        .resolve(&backend)
        .with_context(|| format!("cannot load plugin '{backend}'"))?;

    let request = cli
        .command
        .to_request()
        .context("command does not submit a transaction")?;

    let list = TransactionList::spawn(catalog, ListConfig::new(backend, engine_config));
    let tid = tid::generate();
    anyhow::ensure!(list.create(&tid).await, "failed to create transaction {tid}");
    let transaction = list.get(&tid).await.context("transaction disappeared")?;
    anyhow::ensure!(transaction.set_request(request), "role already selected");
    let mut events = transaction.subscribe();

    let (signal_tx, mut signal_rx) = tokio::sync::mpsc::unbounded_channel();
    spawn_ctrl_c_handler(signal_tx);

    if !list.commit(&tid).await {
        eprintln!("warning: transaction {tid} was not dispatched");
    }

    let mut exit = ExitStatus::Failed;
    loop {
        tokio::select! {
            sig = signal_rx.recv() => match sig {
                Some(CancelSignal::Cancel) => {
                    eprintln!(
                        "Cancel requested; waiting for the job to stop (press CTRL+C again to exit immediately)."
                    );
                    if !transaction.cancel() {
                        eprintln!("warning: the job refused the cancel request");
                    }
                }
                Some(CancelSignal::Exit) | None => {
                    std::process::exit(130);
                }
            },
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                };
                if cli.json {
                    println!("{}", serde_json::to_string(&event)?);
                } else {
                    println!("{}", render_event(&event));
                }
                if let EngineEvent::Finished { exit: job_exit } = event {
                    exit = job_exit;
                    break;
                }
            }
        }
    }

    list.shutdown().await;
    std::process::exit(match exit {
        ExitStatus::Success => 0,
        ExitStatus::Failed => 1,
        ExitStatus::Canceled => 130,
    });
}
