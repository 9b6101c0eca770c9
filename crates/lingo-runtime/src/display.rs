//! Per-channel display scheduling.
//!
//! Each channel is an independent lane: a bounded buffer of
//! [`DisplayItem`]s plus the [`CurrentDisplay`]. A tick, per lane:
//!
//! 1. purges items older than the TTL,
//! 2. truncates the buffer to its capacity (oldest dropped),
//! 3. does nothing while the current item's dwell has not elapsed,
//! 4. otherwise shows the buffered item with the smallest sequence id above
//!    the last one shown, if any. The previous text stays up otherwise.
//!
//! The scheduler never reads the clock itself. The session calls
//! [`DisplayScheduler::tick`] after every apply and at
//! [`DisplayScheduler::next_deadline`].

use std::collections::VecDeque;
use std::time::Duration;

use metrics::counter;
use tracing::{debug, warn};

use lingo_core::{ChannelId, CurrentDisplay, DisplayFrame, DisplayItem, LingoError, SequenceId};
use tokio::time::Instant;

use crate::config::{DisplayConfig, LaneConfig};
use crate::metrics::{DISPLAY_FRAMES_TOTAL, DISPLAY_PURGED_TOTAL, record_error};

/// Read-only view of one lane.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaneSnapshot {
    /// Channel of the lane.
    pub channel: ChannelId,
    /// What the lane shows right now.
    pub current: Option<CurrentDisplay>,
    /// Items waiting for their turn.
    pub buffered: usize,
    /// Highest sequence id ever shown in this sequence space.
    pub last_shown: Option<SequenceId>,
}

#[derive(Debug)]
struct Lane {
    config: LaneConfig,
    buffer: VecDeque<DisplayItem>,
    current: Option<CurrentDisplay>,
    last_shown: Option<SequenceId>,
}

impl Lane {
    fn new(config: LaneConfig) -> Self {
        Self {
            config,
            buffer: VecDeque::new(),
            current: None,
            last_shown: None,
        }
    }

    fn is_fresh(&self, seq: SequenceId) -> bool {
        self.last_shown.is_none_or(|last| seq > last)
    }

    fn purge(&mut self, now: Instant, ttl: Duration, capacity: usize) {
        let before = self.buffer.len();
        self.buffer
            .retain(|item| now.saturating_duration_since(item.enqueued_at) < ttl);
        let expired = before - self.buffer.len();
        if expired > 0 {
            counter!(DISPLAY_PURGED_TOTAL, "reason" => "ttl").increment(expired as u64);
            debug!(channel = %self.config.channel, expired, "purged expired display items");
        }

        let mut dropped = 0usize;
        while self.buffer.len() > capacity {
            let _ = self.buffer.pop_front();
            dropped += 1;
        }
        if dropped > 0 {
            let err = LingoError::BufferOverflow {
                buffer: "channel",
                capacity,
            };
            record_error(&err);
            counter!(DISPLAY_PURGED_TOTAL, "reason" => "capacity").increment(dropped as u64);
            warn!(
                error = %err,
                channel = %self.config.channel,
                dropped,
                "dropped oldest display items"
            );
        }
    }

    fn take_next(&mut self) -> Option<DisplayItem> {
        let idx = self
            .buffer
            .iter()
            .enumerate()
            .filter(|(_, item)| self.is_fresh(item.sequence_id))
            .min_by_key(|(_, item)| item.sequence_id)
            .map(|(i, _)| i)?;
        self.buffer.remove(idx)
    }

    fn tick(&mut self, now: Instant, ttl: Duration, capacity: usize) -> Option<DisplayFrame> {
        self.purge(now, ttl, capacity);

        if self.current.as_ref().is_some_and(|c| !c.dwell_elapsed(now)) {
            return None;
        }

        let item = self.take_next()?;
        // Anything at or below the new frame can never be shown.
        self.buffer.retain(|i| i.sequence_id > item.sequence_id);
        let is_over_length = item.text.chars().count() > self.config.over_length_chars;
        self.last_shown = Some(item.sequence_id);
        self.current = Some(CurrentDisplay {
            text: item.text.clone(),
            started_at: now,
            min_display_time: item.min_display_time,
            sequence_id: item.sequence_id,
        });
        counter!(DISPLAY_FRAMES_TOTAL, "channel" => self.config.channel.to_string()).increment(1);
        Some(DisplayFrame {
            channel: self.config.channel.clone(),
            text: item.text,
            is_over_length,
            sequence_id: item.sequence_id,
        })
    }

    fn next_deadline(&self) -> Option<Instant> {
        let first_enqueued = self
            .buffer
            .iter()
            .filter(|i| self.is_fresh(i.sequence_id))
            .map(|i| i.enqueued_at)
            .min()?;
        Some(match &self.current {
            Some(current) => current.dwell_expires_at(),
            // Nothing shown yet: due as soon as anything is buffered.
            None => first_enqueued,
        })
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.current = None;
        self.last_shown = None;
    }

    fn snapshot(&self) -> LaneSnapshot {
        LaneSnapshot {
            channel: self.config.channel.clone(),
            current: self.current.clone(),
            buffered: self.buffer.len(),
            last_shown: self.last_shown,
        }
    }
}

/// Independent display lanes, one per configured channel.
#[derive(Debug)]
pub struct DisplayScheduler {
    lanes: Vec<Lane>,
    buffer_capacity: usize,
    item_ttl: Duration,
    per_char: Duration,
    max_display: Duration,
}

impl DisplayScheduler {
    /// One lane per entry of `config.lanes`, in that order.
    pub fn new(config: &DisplayConfig) -> Self {
        Self {
            lanes: config.lanes.iter().cloned().map(Lane::new).collect(),
            buffer_capacity: config.buffer_capacity.max(1),
            item_ttl: config.item_ttl,
            per_char: config.per_char,
            max_display: config.max_display,
        }
    }

    /// Channels in lane order.
    pub fn channels(&self) -> impl Iterator<Item = &ChannelId> {
        self.lanes.iter().map(|l| &l.config.channel)
    }

    /// Dwell time for `text` on `channel`:
    /// `clamp(min + per_char * chars, min, max)`.
    pub fn dwell_for(&self, channel: &ChannelId, text: &str) -> Option<Duration> {
        let lane = self.lane(channel)?;
        Some(dwell_time(
            lane.config.min_display,
            self.per_char,
            self.max_display,
            text.chars().count(),
        ))
    }

    /// Buffer `text` for `channel`.
    ///
    /// Returns `false` (item ignored) for an unknown channel, blank text, a
    /// sequence id not above the last one shown on that channel, or one
    /// already buffered there.
    pub fn apply(&mut self, channel: &ChannelId, text: &str, seq: SequenceId, now: Instant) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        let Some(min_display_time) = self.dwell_for(channel, text) else {
            warn!(%channel, %seq, "result for unknown channel ignored");
            return false;
        };
        let Some(lane) = self.lane_mut(channel) else {
            return false;
        };
        if !lane.is_fresh(seq) {
            debug!(%channel, %seq, last_shown = ?lane.last_shown, "out-of-band display item ignored");
            return false;
        }
        if lane.buffer.iter().any(|i| i.sequence_id == seq) {
            debug!(%channel, %seq, "duplicate display item ignored");
            return false;
        }
        lane.buffer.push_back(DisplayItem {
            text: text.to_string(),
            min_display_time,
            sequence_id: seq,
            enqueued_at: now,
        });
        true
    }

    /// Run one tick on every lane. Returns the frames that changed.
    pub fn tick(&mut self, now: Instant) -> Vec<DisplayFrame> {
        let ttl = self.item_ttl;
        let capacity = self.buffer_capacity;
        self.lanes
            .iter_mut()
            .filter_map(|lane| lane.tick(now, ttl, capacity))
            .collect()
    }

    /// Earliest instant at which a tick could change some lane.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.lanes.iter().filter_map(Lane::next_deadline).min()
    }

    /// Whether no lane has buffered items.
    pub fn is_idle(&self) -> bool {
        self.lanes.iter().all(|l| l.buffer.is_empty())
    }

    /// Drop every buffered item, current display, and last-shown marker.
    pub fn clear(&mut self) {
        for lane in &mut self.lanes {
            lane.clear();
        }
    }

    /// Snapshot of every lane, in lane order.
    pub fn snapshot(&self) -> Vec<LaneSnapshot> {
        self.lanes.iter().map(Lane::snapshot).collect()
    }

    fn lane(&self, channel: &ChannelId) -> Option<&Lane> {
        self.lanes.iter().find(|l| &l.config.channel == channel)
    }

    fn lane_mut(&mut self, channel: &ChannelId) -> Option<&mut Lane> {
        self.lanes.iter_mut().find(|l| &l.config.channel == channel)
    }
}

/// `clamp(min + per_char * chars, min, max)`; `max` below `min` is treated as `min`.
pub fn dwell_time(min: Duration, per_char: Duration, max: Duration, chars: usize) -> Duration {
    let chars = u32::try_from(chars).unwrap_or(u32::MAX);
    let raw = min.saturating_add(per_char.saturating_mul(chars));
    raw.min(max.max(min))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn lane(id: &str, min_ms: u64, over: usize) -> LaneConfig {
        LaneConfig {
            channel: id.into(),
            min_display: Duration::from_millis(min_ms),
            over_length_chars: over,
        }
    }

    fn config(lanes: Vec<LaneConfig>) -> DisplayConfig {
        DisplayConfig {
            buffer_capacity: 10,
            item_ttl: Duration::from_secs(10),
            per_char: Duration::ZERO,
            max_display: Duration::from_secs(5),
            lanes,
        }
    }

    fn en() -> ChannelId {
        "en".into()
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn dwell_blocks_replacement_until_elapsed() {
        // seq 5 shown at t=0, seq 7 waits until t=1s.
        let t0 = Instant::now();
        let mut sched = DisplayScheduler::new(&config(vec![lane("en", 1000, 60)]));
        assert!(sched.apply(&en(), "five", SequenceId::new(5), t0));
        assert!(sched.apply(&en(), "seven", SequenceId::new(7), t0));

        let frames = sched.tick(t0);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].sequence_id, SequenceId::new(5));

        assert!(sched.tick(t0 + ms(500)).is_empty());
        assert_eq!(sched.next_deadline(), Some(t0 + ms(1000)));

        let frames = sched.tick(t0 + ms(1000));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].text, "seven");
    }

    #[tokio::test(start_paused = true)]
    async fn no_blanking_when_buffer_is_empty() {
        let t0 = Instant::now();
        let mut sched = DisplayScheduler::new(&config(vec![lane("en", 0, 60)]));
        let _ = sched.apply(&en(), "hello", SequenceId::new(1), t0);
        let _ = sched.tick(t0);
        assert!(sched.tick(t0 + ms(5000)).is_empty());
        let snap = sched.snapshot();
        assert_eq!(snap[0].current.as_ref().map(|c| c.text.as_str()), Some("hello"));
        assert_eq!(sched.next_deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn items_at_or_below_last_shown_are_ignored() {
        let t0 = Instant::now();
        let mut sched = DisplayScheduler::new(&config(vec![lane("en", 0, 60)]));
        let _ = sched.apply(&en(), "four", SequenceId::new(4), t0);
        let _ = sched.tick(t0);
        assert!(!sched.apply(&en(), "three", SequenceId::new(3), t0));
        assert!(!sched.apply(&en(), "four again", SequenceId::new(4), t0));
        assert!(sched.apply(&en(), "five", SequenceId::new(5), t0));
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_sequence_is_buffered_once() {
        let t0 = Instant::now();
        let mut sched = DisplayScheduler::new(&config(vec![lane("en", 1000, 60)]));
        assert!(sched.apply(&en(), "nine", SequenceId::new(9), t0));
        assert!(!sched.apply(&en(), "nine again", SequenceId::new(9), t0));
        assert_eq!(sched.tick(t0).len(), 1);

        assert!(sched.is_idle());
        assert_eq!(sched.next_deadline(), None);
        assert!(sched.tick(t0 + ms(2000)).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_is_never_stuck_in_the_past() {
        // Once a lane's dwell has expired, ticking at its deadline either
        // shows a frame or clears the deadline.
        let t0 = Instant::now();
        let mut sched = DisplayScheduler::new(&config(vec![lane("en", 1000, 60)]));
        for seq in [3, 1, 2, 3, 1] {
            let _ = sched.apply(&en(), "x", SequenceId::new(seq), t0);
        }
        let mut now = t0;
        let mut frames = 0;
        while let Some(at) = sched.next_deadline() {
            now = now.max(at);
            let shown = sched.tick(now);
            assert_eq!(shown.len(), 1, "deadline {at:?} produced no frame");
            frames += 1;
        }
        assert_eq!(frames, 3);
        assert_eq!(now, t0 + ms(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn smallest_sequence_is_shown_first() {
        let t0 = Instant::now();
        let mut sched = DisplayScheduler::new(&config(vec![lane("en", 0, 60)]));
        let _ = sched.apply(&en(), "nine", SequenceId::new(9), t0);
        let _ = sched.apply(&en(), "six", SequenceId::new(6), t0);
        assert_eq!(sched.tick(t0)[0].sequence_id, SequenceId::new(6));
        assert_eq!(sched.tick(t0)[0].sequence_id, SequenceId::new(9));
    }

    #[tokio::test(start_paused = true)]
    async fn blank_and_unknown_channel_items_are_ignored() {
        let t0 = Instant::now();
        let mut sched = DisplayScheduler::new(&config(vec![lane("en", 0, 60)]));
        assert!(!sched.apply(&en(), "   ", SequenceId::new(1), t0));
        assert!(!sched.apply(&"fr".into(), "bonjour", SequenceId::new(1), t0));
        assert!(sched.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_items_are_purged() {
        let t0 = Instant::now();
        let mut sched = DisplayScheduler::new(&config(vec![lane("en", 4000, 60)]));
        let _ = sched.apply(&en(), "one", SequenceId::new(1), t0);
        let _ = sched.tick(t0);
        let _ = sched.apply(&en(), "two", SequenceId::new(2), t0);

        // "two" waited the full TTL behind "one".
        let frames = sched.tick(t0 + Duration::from_secs(10));
        assert!(frames.is_empty());
        assert!(sched.is_idle());
        assert_eq!(sched.snapshot()[0].last_shown, Some(SequenceId::new(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_drops_oldest() {
        let t0 = Instant::now();
        let mut cfg = config(vec![lane("en", 1000, 60)]);
        cfg.buffer_capacity = 3;
        let mut sched = DisplayScheduler::new(&cfg);
        let _ = sched.apply(&en(), "first", SequenceId::new(1), t0);
        let _ = sched.tick(t0);
        for s in 2..=6 {
            let _ = sched.apply(&en(), "x", SequenceId::new(s), t0);
        }
        let _ = sched.tick(t0 + ms(10));
        assert_eq!(sched.snapshot()[0].buffered, 3);

        let frame = sched.tick(t0 + ms(1000));
        assert_eq!(frame[0].sequence_id, SequenceId::new(4));
    }

    #[tokio::test(start_paused = true)]
    async fn lanes_are_independent() {
        let t0 = Instant::now();
        let mut sched =
            DisplayScheduler::new(&config(vec![lane("en", 3000, 60), lane("ja", 0, 30)]));
        let ja: ChannelId = "ja".into();
        let _ = sched.apply(&en(), "hello", SequenceId::new(1), t0);
        let _ = sched.apply(&ja, "こんにちは", SequenceId::new(1), t0);
        assert_eq!(sched.tick(t0).len(), 2);

        let _ = sched.apply(&en(), "world", SequenceId::new(2), t0 + ms(100));
        let _ = sched.apply(&ja, "世界", SequenceId::new(2), t0 + ms(100));
        let frames = sched.tick(t0 + ms(100));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].channel, ja);
    }

    #[tokio::test(start_paused = true)]
    async fn over_length_uses_lane_threshold() {
        let t0 = Instant::now();
        let mut sched = DisplayScheduler::new(&config(vec![lane("en", 0, 5)]));
        let _ = sched.apply(&en(), "short", SequenceId::new(1), t0);
        let _ = sched.apply(&en(), "longer", SequenceId::new(2), t0);
        assert!(!sched.tick(t0)[0].is_over_length);
        assert!(sched.tick(t0)[0].is_over_length);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_forgets_everything() {
        let t0 = Instant::now();
        let mut sched = DisplayScheduler::new(&config(vec![lane("en", 1000, 60)]));
        let _ = sched.apply(&en(), "a", SequenceId::new(8), t0);
        let _ = sched.tick(t0);
        let _ = sched.apply(&en(), "b", SequenceId::new(9), t0);
        sched.clear();
        let snap = &sched.snapshot()[0];
        assert!(snap.current.is_none());
        assert_eq!(snap.buffered, 0);
        assert!(sched.apply(&en(), "fresh", SequenceId::new(1), t0));
    }

    #[test]
    fn dwell_time_clamps() {
        let min = ms(1000);
        let max = ms(3000);
        assert_eq!(dwell_time(min, ms(50), max, 0), min);
        assert_eq!(dwell_time(min, ms(50), max, 20), ms(2000));
        assert_eq!(dwell_time(min, ms(50), max, 1000), max);
        // Inverted bounds fall back to the minimum.
        assert_eq!(dwell_time(min, ms(50), ms(10), 20), min);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn presentation_is_monotone_and_respects_dwell(
                arrivals in prop::collection::vec((1u64..60, 0u64..400), 1..80),
                min_ms in 0u64..1500,
            ) {
                let t0 = Instant::now();
                let mut sched = DisplayScheduler::new(&config(vec![lane("en", min_ms, 60)]));
                let mut now = t0;
                let mut shown: Vec<(Instant, SequenceId)> = Vec::new();

                for (seq, gap) in arrivals {
                    now += ms(gap);
                    let _ = sched.apply(&en(), "t", SequenceId::new(seq), now);
                    for f in sched.tick(now) {
                        shown.push((now, f.sequence_id));
                    }
                    while let Some(at) = sched.next_deadline() {
                        if at > now + ms(200) { break; }
                        now = now.max(at);
                        for f in sched.tick(now) {
                            shown.push((now, f.sequence_id));
                        }
                    }
                }

                for pair in shown.windows(2) {
                    prop_assert!(pair[1].1 > pair[0].1);
                    prop_assert!(pair[1].0.duration_since(pair[0].0) >= ms(min_ms));
                }
            }
        }
    }
}
