//! Errors raised while loading settings.
//!
//! Out-of-range numbers never end up here: [`LingoSettings::validate`]
//! corrects them with a warning. Loading fails only on a settings file that
//! cannot be read or decoded, or on a channel spec with a missing part.
//!
//! [`LingoSettings::validate`]: crate::LingoSettings::validate

use std::path::PathBuf;

use thiserror::Error;

/// Settings loading failure.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The settings file (or the merged result) does not decode as settings.
    #[error("bad settings JSON in {}: {source}", .path.display())]
    Decode {
        /// File the values came from.
        path: PathBuf,
        /// Underlying decode failure.
        source: serde_json::Error,
    },

    /// A channel given as `ID` or `ID:LANG` is missing a part.
    #[error("invalid channel `{spec}`: {problem}")]
    ChannelSpec {
        /// The spec as given.
        spec: String,
        /// What is missing.
        problem: &'static str,
    },
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
