//! Dispatch, reorder, display, session, and backend settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Admission control and backend call settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DispatchSettings {
    /// Maximum backend calls in flight at once (worker pool size).
    pub max_concurrent: usize,
    /// Admission queue capacity; submissions beyond it are refused.
    pub queue_capacity: usize,
    /// Head-of-line timeout armed at admission, in milliseconds.
    pub request_timeout_ms: u64,
    /// HTTP client timeout for a single backend call, in milliseconds.
    pub backend_timeout_ms: u64,
    /// Consecutive failures before a status notice is raised (0 = never).
    pub failure_notice_threshold: u32,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            queue_capacity: 32,
            request_timeout_ms: 3000,
            backend_timeout_ms: 10_000,
            failure_notice_threshold: 5,
        }
    }
}

impl DispatchSettings {
    /// Head-of-line timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Backend call timeout as a [`Duration`].
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }
}

/// Reorder buffer settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReorderSettings {
    /// Maximum out-of-order results held at once.
    pub capacity: usize,
}

impl Default for ReorderSettings {
    fn default() -> Self {
        Self { capacity: 10 }
    }
}

/// Per-channel display lane settings shared by all channels.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplaySettings {
    /// Maximum buffered items per channel.
    pub buffer_capacity: usize,
    /// Buffered items older than this are purged, in milliseconds.
    pub item_ttl_ms: u64,
    /// Base minimum dwell time, in milliseconds.
    pub min_display_ms: u64,
    /// Additional dwell per character, in milliseconds.
    pub per_char_display_ms: u64,
    /// Upper bound for the computed dwell, in milliseconds.
    pub max_display_ms: u64,
    /// Over-length threshold (characters) for non-CJK languages.
    pub over_length_chars: usize,
    /// Over-length threshold (characters) for `ja`/`zh`/`ko`.
    pub cjk_over_length_chars: usize,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            buffer_capacity: 10,
            item_ttl_ms: 10_000,
            min_display_ms: 1000,
            per_char_display_ms: 0,
            max_display_ms: 5000,
            over_length_chars: 60,
            cjk_over_length_chars: 30,
        }
    }
}

impl DisplaySettings {
    /// Item TTL as a [`Duration`].
    pub fn item_ttl(&self) -> Duration {
        Duration::from_millis(self.item_ttl_ms)
    }
}

/// Session lifecycle settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Sequence space rotation interval in seconds (0 disables rotation).
    pub rotation_interval_secs: u64,
    /// How often a due rotation re-checks for quiescence, in milliseconds.
    pub rotation_check_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            rotation_interval_secs: 3600,
            rotation_check_ms: 1000,
        }
    }
}

impl SessionSettings {
    /// Rotation interval, or `None` when rotation is disabled.
    pub fn rotation_interval(&self) -> Option<Duration> {
        (self.rotation_interval_secs > 0).then(|| Duration::from_secs(self.rotation_interval_secs))
    }

    /// Quiescence re-check period as a [`Duration`].
    pub fn rotation_check(&self) -> Duration {
        Duration::from_millis(self.rotation_check_ms)
    }
}

/// Remote translation backend settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendSettings {
    /// Endpoint receiving `POST {text, channels, sequenceId}`.
    pub url: String,
    /// Optional bearer token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8765/translate".to_string(),
            api_key: None,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter directive (overridden by `RUST_LOG`).
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
