//! Resolved session configuration.
//!
//! [`LingoSettings`] is the serialized, user-facing shape. [`SessionConfig`]
//! is what the runtime consumes: durations instead of millisecond counts,
//! per-channel overrides already folded into each lane.

use std::time::Duration;

use tracing::warn;

use lingo_core::{ChannelId, FillerSet};
use lingo_settings::{ChannelSettings, DisplaySettings, LingoSettings};

/// Admission and worker pool parameters.
#[derive(Clone, Debug)]
pub struct DispatchConfig {
    /// Channels a plain `submit` translates into, in answer order.
    pub channels: Vec<ChannelId>,
    /// Worker pool size; also the in-flight ceiling.
    pub max_concurrent: usize,
    /// Admission queue capacity.
    pub queue_capacity: usize,
    /// Head-of-line timeout armed at admission.
    pub request_timeout: Duration,
    /// Tokens that make a transcript filler-only.
    pub filler: FillerSet,
}

/// Per-lane display parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaneConfig {
    /// Channel of the lane.
    pub channel: ChannelId,
    /// Base dwell time.
    pub min_display: Duration,
    /// Text longer than this many chars is flagged over-length.
    pub over_length_chars: usize,
}

impl LaneConfig {
    /// Resolve channel overrides against the display defaults.
    pub fn resolve(channel: &ChannelSettings, display: &DisplaySettings) -> Self {
        let min_display_ms = channel.min_display_ms.unwrap_or(display.min_display_ms);
        let over_length_chars = channel.over_length_chars.unwrap_or(if channel.is_cjk() {
            display.cjk_over_length_chars
        } else {
            display.over_length_chars
        });
        Self {
            channel: ChannelId::from(channel.id.as_str()),
            min_display: Duration::from_millis(min_display_ms),
            over_length_chars,
        }
    }
}

/// Display scheduler parameters.
#[derive(Clone, Debug)]
pub struct DisplayConfig {
    /// Items held per lane before the oldest is dropped.
    pub buffer_capacity: usize,
    /// Buffered items older than this are purged.
    pub item_ttl: Duration,
    /// Extra dwell per character.
    pub per_char: Duration,
    /// Upper bound on dwell.
    pub max_display: Duration,
    /// Lanes in channel order.
    pub lanes: Vec<LaneConfig>,
}

/// Everything a [`Session`](crate::Session) needs.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Admission and worker pool.
    pub dispatch: DispatchConfig,
    /// Maximum out-of-order results held.
    pub reorder_capacity: usize,
    /// Display lanes.
    pub display: DisplayConfig,
    /// Age after which the sequence space rotates. `None` disables rotation.
    pub rotation_interval: Option<Duration>,
    /// How often rotation is checked (and retried when deferred).
    pub rotation_check: Duration,
    /// Consecutive failures before a status notice (0 = never).
    pub failure_notice_threshold: u32,
}

impl SessionConfig {
    /// Resolve from validated settings. Repeated channel ids keep the first entry.
    pub fn from_settings(settings: &LingoSettings) -> Self {
        let mut lanes: Vec<LaneConfig> = Vec::with_capacity(settings.channels.len());
        for channel in &settings.channels {
            let lane = LaneConfig::resolve(channel, &settings.display);
            if lanes.iter().any(|l| l.channel == lane.channel) {
                warn!(channel = %lane.channel, "duplicate channel ignored");
                continue;
            }
            lanes.push(lane);
        }
        Self {
            dispatch: DispatchConfig {
                channels: lanes.iter().map(|l| l.channel.clone()).collect(),
                max_concurrent: settings.dispatch.max_concurrent.max(1),
                queue_capacity: settings.dispatch.queue_capacity.max(1),
                request_timeout: settings.dispatch.request_timeout(),
                filler: FillerSet::new(&settings.filler_tokens),
            },
            reorder_capacity: settings.reorder.capacity,
            display: DisplayConfig {
                buffer_capacity: settings.display.buffer_capacity,
                item_ttl: settings.display.item_ttl(),
                per_char: Duration::from_millis(settings.display.per_char_display_ms),
                max_display: Duration::from_millis(settings.display.max_display_ms),
                lanes,
            },
            rotation_interval: settings.session.rotation_interval(),
            rotation_check: settings.session.rotation_check(),
            failure_notice_threshold: settings.dispatch.failure_notice_threshold,
        }
    }

    /// Default settings with the given channels (id doubles as language).
    pub fn with_channels(channels: &[&str]) -> Self {
        let mut settings = LingoSettings::default();
        settings.channels = channels
            .iter()
            .map(|c| ChannelSettings::for_language(c))
            .collect();
        Self::from_settings(&settings)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_settings(&LingoSettings::default())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
