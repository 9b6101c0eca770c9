//! Shared modules for the `lingo` binary and its tests.
//!
//! `main.rs` wires settings, logging, the backend, and a session together
//! and pumps stdin into it. The pieces worth testing live here.

#![deny(unsafe_code)]

pub mod cli;
pub mod output;

use std::sync::Arc;

use anyhow::{Context, Result};

use lingo_backend::{HttpBackend, HttpBackendConfig, MockBackend, TranslationBackend};
use lingo_settings::LingoSettings;

/// Build the backend selected by settings and the `--mock` flag.
pub fn build_backend(settings: &LingoSettings, mock: bool) -> Result<Arc<dyn TranslationBackend>> {
    if mock {
        return Ok(Arc::new(MockBackend::new()));
    }
    let config = HttpBackendConfig {
        url: settings.backend.url.clone(),
        api_key: settings.backend.api_key.clone(),
        timeout: settings.dispatch.backend_timeout(),
    };
    let backend = HttpBackend::new(config).context("failed to build HTTP backend")?;
    Ok(Arc::new(backend))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
