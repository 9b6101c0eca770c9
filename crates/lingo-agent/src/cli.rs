//! Command-line arguments and how they override loaded settings.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use lingo_settings::{ChannelSettings, LingoSettings};

/// Feed transcript lines from stdin through a translation session.
#[derive(Debug, Parser)]
#[command(name = "lingo", version, about)]
pub struct Args {
    /// Settings file (default: `~/.lingo/settings.json`).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Translation endpoint, overriding `backend.url`.
    #[arg(long)]
    pub backend_url: Option<String>,

    /// Output channel as `ID` or `ID:LANG`. Repeatable; replaces configured channels.
    #[arg(long = "channel", value_name = "ID[:LANG]")]
    pub channels: Vec<String>,

    /// Log level or filter directive (`debug`, `lingo_runtime=trace`).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Use the built-in echo backend instead of HTTP.
    #[arg(long, default_value_t = false)]
    pub mock: bool,
}

impl Args {
    /// Apply CLI overrides on top of file/env settings.
    pub fn apply(&self, settings: &mut LingoSettings) -> Result<()> {
        if let Some(url) = &self.backend_url {
            settings.backend.url.clone_from(url);
        }
        if !self.channels.is_empty() {
            settings.channels = self
                .channels
                .iter()
                .map(|spec| ChannelSettings::parse_spec(spec))
                .collect::<Result<Vec<_>, _>>()
                .context("invalid --channel")?;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
