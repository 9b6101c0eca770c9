//! Layered settings loading.
//!
//! [`load_settings_from_path`] builds settings in four steps:
//! compiled defaults, the JSON file merged over them with [`deep_merge`],
//! `LINGO_*` environment overrides, and finally
//! [`LingoSettings::validate`]. A missing file is not an error.

use std::fmt::Display;
use std::io::ErrorKind;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::LingoSettings;

/// `~/.lingo/settings.json` (falls back to `/tmp` when `HOME` is unset).
pub fn settings_path() -> PathBuf {
    let home = std::env::var_os("HOME").map_or_else(|| PathBuf::from("/tmp"), PathBuf::from);
    home.join(".lingo").join("settings.json")
}

/// [`load_settings_from_path`] on [`settings_path`].
pub fn load_settings() -> Result<LingoSettings> {
    load_settings_from_path(&settings_path())
}

/// Defaults, then the file at `path` (if any), then env overrides, then
/// validation.
pub fn load_settings_from_path(path: &Path) -> Result<LingoSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    settings.validate();
    Ok(settings)
}

fn load_file_layer(path: &Path) -> Result<LingoSettings> {
    let decode = |source| SettingsError::Decode {
        path: path.to_path_buf(),
        source,
    };

    let mut merged = serde_json::to_value(LingoSettings::default()).map_err(decode)?;
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let user: Value = serde_json::from_str(&content).map_err(decode)?;
            debug!(path = %path.display(), "merging settings file over defaults");
            merged = deep_merge(merged, user);
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no settings file, using defaults");
        }
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    }
    serde_json::from_value(merged).map_err(decode)
}

/// Merge `overlay` into `base`.
///
/// Objects merge key by key, recursively. Anything else in `overlay`
/// (arrays included) replaces what `base` had. `null` in `overlay` leaves the
/// base value alone, so a file can mention a key without overriding it.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay.into_iter().filter(|(_, v)| !v.is_null()) {
                let merged = match base.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                let _ = base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}

/// Apply `LINGO_*` environment overrides.
///
/// Numbers outside their range and unparsable values are ignored with a
/// warning, keeping the file or default value.
pub fn apply_env_overrides(settings: &mut LingoSettings) {
    if let Some(v) = env_in("LINGO_MAX_CONCURRENT", 1..=64) {
        settings.dispatch.max_concurrent = v;
    }
    if let Some(v) = env_in("LINGO_QUEUE_CAPACITY", 1..=10_000) {
        settings.dispatch.queue_capacity = v;
    }
    if let Some(v) = env_in("LINGO_REQUEST_TIMEOUT_MS", 100..=600_000) {
        settings.dispatch.request_timeout_ms = v;
    }
    if let Some(v) = env_in("LINGO_BACKEND_TIMEOUT_MS", 100..=600_000) {
        settings.dispatch.backend_timeout_ms = v;
    }
    if let Some(v) = env_in("LINGO_MIN_DISPLAY_MS", 0..=60_000) {
        settings.display.min_display_ms = v;
    }
    if let Some(v) = env_in("LINGO_ITEM_TTL_MS", 100..=600_000) {
        settings.display.item_ttl_ms = v;
    }
    if let Some(v) = env_in("LINGO_ROTATION_INTERVAL_SECS", 0..=7 * 24 * 3600) {
        settings.session.rotation_interval_secs = v;
    }
    if let Some(v) = env_value("LINGO_BACKEND_URL") {
        settings.backend.url = v;
    }
    if let Some(v) = env_value("LINGO_API_KEY") {
        settings.backend.api_key = Some(v);
    }
    if let Some(v) = env_value("LINGO_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env_flag("LINGO_LOG_JSON") {
        settings.logging.json = v;
    }
}

/// `1`/`true`/`yes`/`on` or `0`/`false`/`no`/`off`, any case, surrounding
/// whitespace ignored.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse `raw` as a `T` inside `range`.
pub fn parse_in_range<T>(raw: &str, range: &RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd,
{
    raw.trim().parse().ok().filter(|v| range.contains(v))
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_in<T>(name: &str, range: RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd + Display,
{
    let raw = env_value(name)?;
    let parsed = parse_in_range(&raw, &range);
    if parsed.is_none() {
        warn!(
            key = name,
            value = %raw,
            min = %range.start(),
            max = %range.end(),
            "ignoring env override"
        );
    }
    parsed
}

fn env_flag(name: &str) -> Option<bool> {
    let raw = env_value(name)?;
    let parsed = parse_flag(&raw);
    if parsed.is_none() {
        warn!(key = name, value = %raw, "ignoring env override, expected a flag");
    }
    parsed
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
