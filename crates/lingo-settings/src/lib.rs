//! # lingo-settings
//!
//! Configuration management with layered sources.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`LingoSettings::default()`]
//! 2. **User file**: `~/.lingo/settings.json` or an explicit path
//!    (deep-merged over defaults)
//! 3. **Environment variables**: `LINGO_*` overrides (highest priority)
//!
//! Settings are plain values handed to the session at construction; there is
//! no process-wide singleton.
//!
//! # Usage
//!
//! ```no_run
//! use lingo_settings::load_settings;
//!
//! let settings = load_settings().unwrap_or_default();
//! println!("max concurrent: {}", settings.dispatch.max_concurrent);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = LingoSettings::default();
        let _path = settings_path();
        let _chan = ChannelSettings::for_language("ja");
    }

    #[test]
    fn deep_merge_re_exported() {
        let a = serde_json::json!({"x": 1});
        let b = serde_json::json!({"y": 2});
        let merged = deep_merge(a, b);
        assert_eq!(merged["x"], 1);
        assert_eq!(merged["y"], 2);
    }
}
