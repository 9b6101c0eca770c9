//! `lingo`: read transcript lines from stdin, print translated frames.

#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use lingo_agent::build_backend;
use lingo_agent::cli::Args;
use lingo_agent::output::{StderrNotifier, StdoutRenderer};
use lingo_core::RejectReason;
use lingo_core::logging::{init_json_subscriber, init_subscriber};
use lingo_runtime::{Session, SessionConfig, SubmitOutcome};
use lingo_settings::{load_settings, load_settings_from_path};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => load_settings_from_path(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => load_settings().context("failed to load settings")?,
    };
    args.apply(&mut settings)?;
    settings.validate();

    if settings.logging.json {
        init_json_subscriber(&settings.logging.level);
    } else {
        init_subscriber(&settings.logging.level);
    }

    let backend = build_backend(&settings, args.mock)?;
    info!(
        backend = backend.name(),
        url = %settings.backend.url,
        channels = settings.channels.len(),
        "starting"
    );

    let session = Session::spawn(
        SessionConfig::from_settings(&settings),
        backend,
        Arc::new(StdoutRenderer),
        Arc::new(StderrNotifier),
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    debug!("stdin closed");
                    break;
                };
                match session.submit(line).await? {
                    SubmitOutcome::Accepted(seq) => debug!(%seq, "submitted"),
                    SubmitOutcome::Rejected(RejectReason::QueueFull) => {
                        warn!("translation queue full, line dropped");
                    }
                    SubmitOutcome::Rejected(reason) => debug!(%reason, "line skipped"),
                }
            }
            result = tokio::signal::ctrl_c() => {
                result.context("failed to listen for ctrl-c")?;
                info!("interrupted");
                break;
            }
        }
    }

    session.shutdown().await?;
    Ok(())
}
