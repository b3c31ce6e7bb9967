mod audit;
mod cli;
mod config;
mod dispatch;
mod error;
mod escalation;
mod export;
mod roster;
mod ui;
mod workflow;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;

use audit::AuditStore;
use cli::{Cli, Command};
use config::RagtrackConfig;
use dispatch::{AnyNotifier, Dispatcher};
use escalation::EscalationPolicy;
use roster::{Employee, Roster};
use workflow::{SubmissionPipeline, SubmissionRequest};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = RagtrackConfig::load()?;

    match cli.command {
        Command::Search { query } => {
            let roster = load_roster(&cli.roster)?;
            let hits = roster.search(&query);
            if hits.is_empty() {
                println!("No employee found with that name or ID.");
            } else {
                ui::print_employees(hits);
            }
        }
        Command::Submit {
            query,
            status,
            comment,
            use_first,
        } => {
            submit(&cli.roster, &config, query, status.into(), comment, use_first).await?;
        }
        Command::History => {
            let store = AuditStore::open(Path::new(&config.audit_path))?;
            ui::print_history(&store.snapshot());
        }
        Command::Export { out } => {
            let store = AuditStore::open(Path::new(&config.audit_path))?;
            let bytes = export::render_audit_json(&store.snapshot())?;
            std::fs::write(&out, bytes)
                .with_context(|| format!("failed to write export file {out}"))?;
            println!("Audit log exported to {out}");
        }
        Command::Report { query, out } => {
            let roster = load_roster(&cli.roster)?;
            let rows = export::report_selection(roster.search(&query), &roster);
            let csv = export::render_roster_csv(rows);
            std::fs::write(&out, csv)
                .with_context(|| format!("failed to write report file {out}"))?;
            println!("Employee report written to {out}");
        }
        Command::Demo => demo(&config).await?,
    }

    Ok(())
}

fn load_roster(path: &str) -> Result<Roster> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read roster file {path}"))?;
    Ok(Roster::from_csv_bytes(&bytes)?)
}

/// Cancellation wired to Ctrl-C: in-flight notification targets are
/// reported as cancelled instead of being dropped.
fn cancel_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("cancellation requested, aborting in-flight dispatch");
            let _ = tx.send(true);
        }
    });
    rx
}

async fn submit(
    roster_path: &str,
    config: &RagtrackConfig,
    query: String,
    status: audit::RagStatus,
    comment: String,
    use_first: bool,
) -> Result<()> {
    let roster = load_roster(roster_path)?;
    let store = AuditStore::open(Path::new(&config.audit_path))?;
    let policy = EscalationPolicy::from_config(config);
    let dispatcher = Dispatcher::from_config(AnyNotifier::from_config(config), config);
    let pipeline = SubmissionPipeline::new(&roster, &store, &policy, &dispatcher);

    let progress = ui::SubmitProgress::start(&query);
    let request = SubmissionRequest {
        query,
        status,
        comment,
        use_first,
    };

    match pipeline.submit(request, cancel_on_ctrl_c()).await {
        Ok(outcome) => {
            progress.complete(&outcome);
            progress.print_outcome(&outcome);
            Ok(())
        }
        Err(e) => {
            progress.fail(&e);
            Err(e.into())
        }
    }
}

/// Embedded demo: a small fixed roster, an in-memory store and
/// simulated delivery, exercising both the Red and the Green path.
async fn demo(config: &RagtrackConfig) -> Result<()> {
    let roster = Roster::new(vec![
        Employee {
            id: "123".into(),
            name: "John Doe".into(),
            manager_name: "Jane Smith".into(),
            email: "john.doe@company.com".into(),
        },
        Employee {
            id: "456".into(),
            name: "Mary Major".into(),
            manager_name: "Jane Smith".into(),
            email: "mary.major@company.com".into(),
        },
    ]);
    let store = AuditStore::in_memory();
    let policy = EscalationPolicy::from_config(config);
    let dispatcher = Dispatcher::from_config(dispatch::ConsoleNotifier, config);
    let pipeline = SubmissionPipeline::new(&roster, &store, &policy, &dispatcher);

    for (query, status, comment) in [
        ("John Doe", audit::RagStatus::Red, "needs support"),
        ("Mary Major", audit::RagStatus::Green, "on track"),
    ] {
        let progress = ui::SubmitProgress::start(query);
        let request = SubmissionRequest {
            query: query.to_string(),
            status,
            comment: comment.to_string(),
            use_first: false,
        };
        let outcome = pipeline.submit(request, cancel_on_ctrl_c()).await?;
        progress.complete(&outcome);
    }

    println!();
    ui::print_history(&store.snapshot());
    Ok(())
}
