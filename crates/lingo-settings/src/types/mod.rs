//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` for the JSON file
//! format. Each type implements [`Default`] with production default values.
//! Types marked with `#[serde(default)]` allow partial JSON: missing fields
//! get their default value during deserialization.

mod channels;
mod pipeline;

pub use channels::*;
pub use pipeline::*;

use std::collections::HashSet;

use lingo_core::DEFAULT_FILLER_TOKENS;
use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// Loaded from `~/.lingo/settings.json` with defaults applied for missing
/// fields. Environment variables can override specific values.
///
/// # JSON Format
///
/// ```json
/// {
///   "dispatch": { "maxConcurrent": 3 },
///   "channels": [{ "id": "ja", "language": "ja" }]
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LingoSettings {
    /// Settings schema version.
    pub version: String,
    /// Admission control and backend call settings.
    pub dispatch: DispatchSettings,
    /// Reorder buffer settings.
    pub reorder: ReorderSettings,
    /// Display lane settings.
    pub display: DisplaySettings,
    /// Session rotation settings.
    pub session: SessionSettings,
    /// Remote backend settings.
    pub backend: BackendSettings,
    /// Output channels, in request order.
    pub channels: Vec<ChannelSettings>,
    /// Hesitation tokens that are never submitted on their own.
    pub filler_tokens: Vec<String>,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for LingoSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            dispatch: DispatchSettings::default(),
            reorder: ReorderSettings::default(),
            display: DisplaySettings::default(),
            session: SessionSettings::default(),
            backend: BackendSettings::default(),
            channels: default_channels(),
            filler_tokens: default_filler_tokens(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Default filler token list.
pub fn default_filler_tokens() -> Vec<String> {
    DEFAULT_FILLER_TOKENS
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

impl LingoSettings {
    /// Correct invalid values in place.
    ///
    /// Called automatically during loading. Out-of-range values are corrected
    /// with a warning rather than rejected.
    pub fn validate(&mut self) {
        fn at_least_one(val: &mut usize, name: &str) {
            if *val == 0 {
                tracing::warn!("{name} must be at least 1, correcting");
                *val = 1;
            }
        }

        at_least_one(&mut self.dispatch.max_concurrent, "dispatch.max_concurrent");
        at_least_one(&mut self.dispatch.queue_capacity, "dispatch.queue_capacity");
        at_least_one(&mut self.reorder.capacity, "reorder.capacity");
        at_least_one(&mut self.display.buffer_capacity, "display.buffer_capacity");

        if self.session.rotation_check_ms == 0 {
            tracing::warn!("session.rotation_check_ms must be positive, using 1000");
            self.session.rotation_check_ms = 1000;
        }

        let dwell = &mut self.display;
        if dwell.max_display_ms < dwell.min_display_ms {
            tracing::warn!(
                max_display_ms = dwell.max_display_ms,
                min_display_ms = dwell.min_display_ms,
                "display.max_display_ms below min_display_ms, raising it"
            );
            dwell.max_display_ms = dwell.min_display_ms;
        }

        let mut seen = HashSet::new();
        self.channels.retain(|c| {
            let fresh = seen.insert(c.id.clone());
            if !fresh {
                tracing::warn!(channel = %c.id, "duplicate channel id, dropping");
            }
            fresh
        });
        if self.channels.is_empty() {
            tracing::warn!("no channels configured, using default");
            self.channels = default_channels();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_version() {
        let s = LingoSettings::default();
        assert_eq!(s.version, "0.1.0");
        assert_eq!(s.channels.len(), 1);
        assert!(!s.filler_tokens.is_empty());
    }

    #[test]
    fn default_settings_serde_roundtrip() {
        let defaults = LingoSettings::default();
        let json = serde_json::to_string(&defaults).unwrap();
        let back: LingoSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.dispatch.max_concurrent, defaults.dispatch.max_concurrent);
        assert_eq!(back.display.item_ttl_ms, defaults.display.item_ttl_ms);
        assert_eq!(back.channels, defaults.channels);
    }

    #[test]
    fn default_settings_json_field_names() {
        let json = serde_json::to_value(LingoSettings::default()).unwrap();
        assert!(json.get("fillerTokens").is_some());
        assert!(json["dispatch"].get("maxConcurrent").is_some());
        assert!(json["display"].get("itemTtlMs").is_some());
        assert!(json["session"].get("rotationIntervalSecs").is_some());
    }

    #[test]
    fn validate_corrects_zero_capacities() {
        let mut s = LingoSettings::default();
        s.dispatch.max_concurrent = 0;
        s.dispatch.queue_capacity = 0;
        s.reorder.capacity = 0;
        s.display.buffer_capacity = 0;
        s.validate();
        assert_eq!(s.dispatch.max_concurrent, 1);
        assert_eq!(s.dispatch.queue_capacity, 1);
        assert_eq!(s.reorder.capacity, 1);
        assert_eq!(s.display.buffer_capacity, 1);
    }

    #[test]
    fn validate_corrects_inverted_dwell_bounds() {
        let mut s = LingoSettings::default();
        s.display.min_display_ms = 2000;
        s.display.max_display_ms = 500;
        s.validate();
        assert_eq!(s.display.max_display_ms, 2000);
    }

    #[test]
    fn validate_dedupes_channels() {
        let mut s = LingoSettings::default();
        s.channels = vec![
            ChannelSettings::for_language("ja"),
            ChannelSettings::for_language("en"),
            ChannelSettings::for_language("ja"),
        ];
        s.validate();
        let ids: Vec<_> = s.channels.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["ja", "en"]);
    }

    #[test]
    fn validate_restores_empty_channels() {
        let mut s = LingoSettings::default();
        s.channels.clear();
        s.validate();
        assert_eq!(s.channels, default_channels());
    }

    #[test]
    fn validate_leaves_defaults_untouched() {
        let mut s = LingoSettings::default();
        s.validate();
        assert_eq!(s.dispatch.max_concurrent, 5);
        assert_eq!(s.display.max_display_ms, 5000);
    }
}
