//! Output channel definitions.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// One output lane.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSettings {
    /// Channel id, unique within a session.
    pub id: String,
    /// Target language code (`"en"`, `"ja"`).
    pub language: String,
    /// Override of [`DisplaySettings::min_display_ms`](crate::DisplaySettings::min_display_ms).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_display_ms: Option<u64>,
    /// Override of the language-derived over-length threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub over_length_chars: Option<usize>,
}

impl ChannelSettings {
    /// Channel whose id is its language code.
    pub fn for_language(language: &str) -> Self {
        Self {
            id: language.to_string(),
            language: language.to_string(),
            min_display_ms: None,
            over_length_chars: None,
        }
    }

    /// Parse a CLI spec: `ID` or `ID:LANG`.
    pub fn parse_spec(spec: &str) -> Result<Self> {
        let (id, language) = match spec.split_once(':') {
            Some((id, lang)) => (id.trim(), lang.trim()),
            None => (spec.trim(), spec.trim()),
        };
        if id.is_empty() {
            return Err(SettingsError::ChannelSpec {
                spec: spec.to_string(),
                problem: "no id",
            });
        }
        if language.is_empty() {
            return Err(SettingsError::ChannelSpec {
                spec: spec.to_string(),
                problem: "no language",
            });
        }
        Ok(Self {
            id: id.to_string(),
            language: language.to_string(),
            min_display_ms: None,
            over_length_chars: None,
        })
    }

    /// Whether the language is written without word spacing (`ja`, `zh`, `ko`).
    pub fn is_cjk(&self) -> bool {
        let primary = self
            .language
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        matches!(primary.as_str(), "ja" | "zh" | "ko")
    }
}

/// Default channel list: a single English lane.
pub fn default_channels() -> Vec<ChannelSettings> {
    vec![ChannelSettings::for_language("en")]
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_spec_id_only() {
        let c = ChannelSettings::parse_spec("ja").unwrap();
        assert_eq!(c.id, "ja");
        assert_eq!(c.language, "ja");
    }

    #[test]
    fn parse_spec_id_and_language() {
        let c = ChannelSettings::parse_spec("subtitle-top:zh-Hant").unwrap();
        assert_eq!(c.id, "subtitle-top");
        assert_eq!(c.language, "zh-Hant");
        assert!(c.is_cjk());
    }

    #[test]
    fn parse_spec_rejects_missing_parts() {
        assert!(ChannelSettings::parse_spec(":en").is_err());
        assert!(ChannelSettings::parse_spec("top:").is_err());
        assert!(ChannelSettings::parse_spec("").is_err());
    }

    #[test]
    fn cjk_detection() {
        assert!(ChannelSettings::for_language("ja").is_cjk());
        assert!(ChannelSettings::for_language("ko_KR").is_cjk());
        assert!(!ChannelSettings::for_language("en").is_cjk());
        assert!(!ChannelSettings::for_language("jav").is_cjk());
    }

    #[test]
    fn overrides_omitted_when_none() {
        let json = serde_json::to_value(ChannelSettings::for_language("en")).unwrap();
        assert!(json.get("minDisplayMs").is_none());
        assert_eq!(json["id"], "en");
    }

    #[test]
    fn default_is_single_english_channel() {
        let chans = default_channels();
        assert_eq!(chans.len(), 1);
        assert_eq!(chans[0].id, "en");
    }
}
