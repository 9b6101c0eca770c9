//! Data model shared by the dispatcher, reorder buffer, and display scheduler.
//!
//! Timestamps are [`tokio::time::Instant`] so that every timing decision runs
//! on the monotonic clock and can be paused/advanced in tests.

use std::time::Duration;

use tokio::time::Instant;

use crate::ids::{ChannelId, SequenceId};

/// A transcript accepted for translation.
///
/// Created by the dispatcher at admission; discarded once the backend call
/// finishes (successfully or not).
#[derive(Clone, Debug)]
pub struct TranslationRequest {
    /// Normalized transcript text.
    pub text: String,
    /// Target channels, in the order the backend must answer them.
    pub channels: Vec<ChannelId>,
    /// Position in the session's submission order.
    pub sequence_id: SequenceId,
    /// When the request was admitted.
    pub submitted_at: Instant,
}

impl TranslationRequest {
    /// Time at which the head-of-line timeout for this request fires.
    pub fn deadline(&self, timeout: Duration) -> Instant {
        self.submitted_at + timeout
    }
}

/// A backend answer (or failure placeholder) waiting to be applied in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslationResult {
    /// Sequence id of the originating request.
    pub sequence_id: SequenceId,
    /// Channels of the originating request.
    pub channels: Vec<ChannelId>,
    /// One string per entry of `channels`, same order. Empty strings mean
    /// "nothing to show" and never become display items.
    pub per_channel_text: Vec<String>,
    /// When the answer reached the session.
    pub arrived_at: Instant,
}

impl TranslationResult {
    /// Build a failure placeholder: same sequence id, empty text for every channel.
    pub fn failed(sequence_id: SequenceId, channels: Vec<ChannelId>, arrived_at: Instant) -> Self {
        let per_channel_text = vec![String::new(); channels.len()];
        Self {
            sequence_id,
            channels,
            per_channel_text,
            arrived_at,
        }
    }

    /// Whether every channel text is empty (failed or blank translation).
    pub fn is_empty(&self) -> bool {
        self.per_channel_text.iter().all(|t| t.trim().is_empty())
    }

    /// Iterate `(channel, text)` pairs, skipping empty texts.
    pub fn texts(&self) -> impl Iterator<Item = (&ChannelId, &str)> {
        self.channels
            .iter()
            .zip(self.per_channel_text.iter())
            .filter(|(_, t)| !t.trim().is_empty())
            .map(|(c, t)| (c, t.as_str()))
    }
}

/// An item buffered in one channel lane, waiting for its turn on screen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayItem {
    /// Text to show.
    pub text: String,
    /// Minimum time the text stays visible once shown.
    pub min_display_time: Duration,
    /// Sequence id of the result it was derived from.
    pub sequence_id: SequenceId,
    /// When the item entered the lane buffer.
    pub enqueued_at: Instant,
}

/// What a channel is showing right now.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentDisplay {
    /// Visible text.
    pub text: String,
    /// When the text became visible.
    pub started_at: Instant,
    /// Minimum dwell before it may be replaced.
    pub min_display_time: Duration,
    /// Sequence id of the shown item.
    pub sequence_id: SequenceId,
}

impl CurrentDisplay {
    /// Instant at which the dwell time has fully elapsed.
    pub fn dwell_expires_at(&self) -> Instant {
        self.started_at + self.min_display_time
    }

    /// Whether the dwell time has elapsed at `now`.
    pub fn dwell_elapsed(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started_at) >= self.min_display_time
    }
}

/// Payload handed to the rendering collaborator when a channel changes text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayFrame {
    /// Lane that changed.
    pub channel: ChannelId,
    /// New visible text.
    pub text: String,
    /// Layout hint: the text is longer than the channel's threshold.
    pub is_over_length: bool,
    /// Sequence id of the shown item.
    pub sequence_id: SequenceId,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
