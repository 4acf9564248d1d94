//! `study` - command-line front end of the study assistant.

mod cli;
mod commands;
mod render;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use shared::{AppSnapshot, Config, Notice, StudyApp};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env().context("loading configuration")?;
    let token = config.auth_token.clone();

    let snapshot = load_snapshot(&cli.state);
    let mut app = StudyApp::new(config)?.restore(snapshot);
    if let Some(token) = token {
        app.sign_in(&token).await?;
    }

    let result = commands::run(&mut app, cli.command).await;

    // Saved on failure too: a refreshed balance or a half-taken exam is kept.
    save_snapshot(&cli.state, &app.snapshot())?;
    result
}

fn load_snapshot(path: &Path) -> AppSnapshot {
    AppSnapshot::load_from(path).unwrap_or_else(|e| {
        error!(path = %path.display(), error = %e, "Discarding unreadable state file");
        AppSnapshot::default()
    })
}

fn save_snapshot(path: &Path, snapshot: &AppSnapshot) -> Result<()> {
    snapshot
        .save_to(path)
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "Saved state");
    Ok(())
}

fn report(err: &anyhow::Error) {
    let Some(study_err) = err.downcast_ref::<shared::Error>() else {
        eprintln!("error: {:#}", err);
        return;
    };

    match study_err.notice() {
        Notice::CreditsModal {
            required,
            current,
            description,
        } => {
            eprintln!("Not enough credits: {} required, {} available.", required, current);
            if let Some(description) = description {
                eprintln!("{}", description);
            }
            eprintln!("Top up with `study credits add <AMOUNT>` or redeem a link with `study claim`.");
        }
        Notice::Inline(message) => eprintln!("{}", message),
        Notice::Alert(message) => eprintln!("error: {}", message),
    }
}
