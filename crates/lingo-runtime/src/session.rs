//! The session event loop.
//!
//! One task owns every piece of mutable pipeline state: the dispatcher (and
//! its sequence allocator), the reorder buffer, the display lanes, and the
//! head-of-line timeouts. Everything reaches it as an event:
//!
//! - commands from [`SessionHandle`]s,
//! - completions from the worker pool,
//! - the earliest head-of-line deadline,
//! - the earliest dwell expiry,
//! - the rotation check interval.
//!
//! Because all transitions run on this one loop, ordering comes from the
//! reorder buffer's sequencing, never from locks.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use lingo_backend::TranslationBackend;
use lingo_core::{
    ChannelId, LingoError, RejectReason, Result, SequenceId, SessionId, TranslationResult,
};

use crate::config::SessionConfig;
use crate::dispatcher::{CallOutcome, Completion, RequestDispatcher};
use crate::display::{DisplayScheduler, LaneSnapshot};
use crate::metrics::SESSION_ROTATIONS_TOTAL;
use crate::notify::{Renderer, StatusNotifier};
use crate::reorder::ReorderBuffer;

const COMMAND_BUFFER: usize = 64;

/// Answer to a submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Admitted under this sequence id.
    Accepted(SequenceId),
    /// Refused; no sequence id was consumed.
    Rejected(RejectReason),
}

/// Point-in-time view of a session.
#[derive(Clone, Debug)]
pub struct SessionSnapshot {
    /// Current session id.
    pub session_id: SessionId,
    /// Number of rotations so far.
    pub generation: u64,
    /// Id the next admitted request gets.
    pub next_sequence: SequenceId,
    /// Reorder cursor.
    pub expected_sequence: SequenceId,
    /// Results waiting out of order.
    pub pending: usize,
    /// Admitted requests not yet completed.
    pub outstanding: usize,
    /// Backend calls in progress.
    pub in_flight: usize,
    /// Display lanes, in channel order.
    pub lanes: Vec<LaneSnapshot>,
}

impl SessionSnapshot {
    /// Lane for `channel`, if configured.
    pub fn lane(&self, channel: &str) -> Option<&LaneSnapshot> {
        self.lanes.iter().find(|l| l.channel.as_str() == channel)
    }
}

enum Command {
    Submit {
        text: String,
        channels: Option<Vec<ChannelId>>,
        reply: oneshot::Sender<SubmitOutcome>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Rotate {
        reply: oneshot::Sender<bool>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable handle to a running session.
///
/// Dropping every handle stops the loop without draining.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
}

impl SessionHandle {
    /// Submit a transcript for every configured channel.
    pub async fn submit(&self, text: impl Into<String>) -> Result<SubmitOutcome> {
        let text = text.into();
        self.request(|reply| Command::Submit {
            text,
            channels: None,
            reply,
        })
        .await
    }

    /// Submit a transcript for a subset of the configured channels.
    pub async fn submit_to(
        &self,
        text: impl Into<String>,
        channels: &[ChannelId],
    ) -> Result<SubmitOutcome> {
        let text = text.into();
        let channels = Some(channels.to_vec());
        self.request(|reply| Command::Submit {
            text,
            channels,
            reply,
        })
        .await
    }

    /// Current state of the session.
    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Ask for a rotation. Returns `true` if it happened immediately; otherwise
    /// it happens at the first quiescent rotation check.
    pub async fn rotate_now(&self) -> Result<bool> {
        self.request(|reply| Command::Rotate { reply }).await
    }

    /// Stop accepting submissions, let outstanding work reach the display,
    /// then stop the loop.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| LingoError::SessionClosed)?;
        rx.await.map_err(|_| LingoError::SessionClosed)
    }
}

/// Loop state. Constructed and driven by [`Session::spawn`].
pub struct Session {
    dispatcher: RequestDispatcher,
    completions: mpsc::Receiver<Completion>,
    commands: mpsc::Receiver<Command>,
    reorder: ReorderBuffer,
    display: DisplayScheduler,
    timeouts: VecDeque<(SequenceId, Instant)>,
    renderer: Arc<dyn Renderer>,
    notifier: Arc<dyn StatusNotifier>,
    rotation_interval: Option<Duration>,
    rotation_check: Duration,
    rotation_requested: bool,
    failure_notice_threshold: u32,
    consecutive_failures: u32,
    unavailable_notified: bool,
    draining: bool,
    shutdown_waiters: Vec<oneshot::Sender<()>>,
}

impl Session {
    /// Start a session loop on the current runtime.
    pub fn spawn(
        config: SessionConfig,
        backend: Arc<dyn TranslationBackend>,
        renderer: Arc<dyn Renderer>,
        notifier: Arc<dyn StatusNotifier>,
    ) -> SessionHandle {
        let now = Instant::now();
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (dispatcher, completions) = RequestDispatcher::start(config.dispatch, backend, now);
        info!(
            session_id = %dispatcher.allocator().session_id(),
            channels = dispatcher.channels().len(),
            "session started"
        );
        let session = Self {
            dispatcher,
            completions,
            commands: commands_rx,
            reorder: ReorderBuffer::new(config.reorder_capacity),
            display: DisplayScheduler::new(&config.display),
            timeouts: VecDeque::new(),
            renderer,
            notifier,
            rotation_interval: config.rotation_interval,
            rotation_check: config.rotation_check.max(Duration::from_millis(1)),
            rotation_requested: false,
            failure_notice_threshold: config.failure_notice_threshold,
            consecutive_failures: 0,
            unavailable_notified: false,
            draining: false,
            shutdown_waiters: Vec::new(),
        };
        let _handle = tokio::spawn(session.run());
        SessionHandle {
            commands: commands_tx,
        }
    }

    async fn run(mut self) {
        let mut rotation_timer =
            tokio::time::interval_at(Instant::now() + self.rotation_check, self.rotation_check);
        rotation_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let head_deadline = self.timeouts.front().map(|(_, at)| *at);
            let dwell_deadline = self.display.next_deadline();

            tokio::select! {
                biased;
                Some(completion) = self.completions.recv() => {
                    self.on_completion(completion);
                }
                () = sleep_until(head_deadline) => {
                    self.on_head_timeouts(Instant::now());
                }
                () = sleep_until(dwell_deadline) => {
                    self.present(Instant::now());
                }
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        debug!("all session handles dropped");
                        break;
                    };
                    self.on_command(command);
                }
                _ = rotation_timer.tick() => {
                    let _ = self.try_rotate(Instant::now());
                }
            }

            if self.draining && self.is_drained() {
                break;
            }
        }

        self.dispatcher.shutdown();
        info!(session_id = %self.dispatcher.allocator().session_id(), "session stopped");
        for waiter in self.shutdown_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    fn on_command(&mut self, command: Command) {
        let now = Instant::now();
        match command {
            Command::Submit {
                text,
                channels,
                reply,
            } => {
                if self.draining {
                    // Dropping the reply surfaces as `SessionClosed`.
                    return;
                }
                let outcome = match self.dispatcher.submit(&text, channels.as_deref(), now) {
                    Ok(admitted) => {
                        self.timeouts
                            .push_back((admitted.sequence_id, admitted.deadline));
                        SubmitOutcome::Accepted(admitted.sequence_id)
                    }
                    Err(reason) => SubmitOutcome::Rejected(reason),
                };
                let _ = reply.send(outcome);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::Rotate { reply } => {
                self.rotation_requested = true;
                let _ = reply.send(self.try_rotate(now));
            }
            Command::Shutdown { reply } => {
                if !self.draining {
                    info!(
                        outstanding = self.dispatcher.outstanding(),
                        pending = self.reorder.pending_len(),
                        "session draining"
                    );
                }
                self.draining = true;
                self.shutdown_waiters.push(reply);
            }
        }
    }

    fn on_completion(&mut self, completion: Completion) {
        let now = Instant::now();
        if !self.dispatcher.on_completion(&completion) {
            debug!(
                seq = %completion.result.sequence_id,
                "completion from a previous sequence space discarded"
            );
            return;
        }
        self.track_outcome(&completion.outcome);
        let outcome = self.reorder.on_result(completion.result);
        self.apply_ready(outcome.ready, now);
    }

    fn on_head_timeouts(&mut self, now: Instant) {
        while let Some(&(seq, at)) = self.timeouts.front() {
            if at > now {
                break;
            }
            let _ = self.timeouts.pop_front();
            let outcome = self.reorder.on_timeout(seq);
            self.apply_ready(outcome.ready, now);
        }
    }

    fn apply_ready(&mut self, ready: Vec<TranslationResult>, now: Instant) {
        if ready.is_empty() {
            return;
        }
        for result in &ready {
            for (channel, text) in result.texts() {
                let _ = self.display.apply(channel, text, result.sequence_id, now);
            }
        }
        self.present(now);
    }

    fn present(&mut self, now: Instant) {
        for frame in self.display.tick(now) {
            debug!(
                channel = %frame.channel,
                seq = %frame.sequence_id,
                over_length = frame.is_over_length,
                "frame"
            );
            self.renderer.render(&frame);
        }
    }

    fn track_outcome(&mut self, outcome: &CallOutcome) {
        match outcome {
            CallOutcome::Translated => {
                if self.unavailable_notified {
                    info!("translation backend recovered");
                    self.notifier.notify("translation backend recovered");
                }
                self.consecutive_failures = 0;
                self.unavailable_notified = false;
            }
            CallOutcome::Failed(_) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                if self.failure_notice_threshold > 0
                    && self.consecutive_failures == self.failure_notice_threshold
                {
                    warn!(
                        failures = self.consecutive_failures,
                        "translation backend unavailable"
                    );
                    self.notifier.notify(&format!(
                        "translation backend unavailable: {} consecutive requests failed",
                        self.consecutive_failures
                    ));
                    self.unavailable_notified = true;
                }
            }
            CallOutcome::Expired => {}
        }
    }

    /// Rotate if due (or requested) and quiescent. Returns whether it rotated.
    fn try_rotate(&mut self, now: Instant) -> bool {
        let due = self.rotation_requested
            || self
                .dispatcher
                .allocator()
                .is_rotation_due(now, self.rotation_interval);
        if !due || self.draining {
            return false;
        }
        if self.reorder.pending_len() > 0 {
            debug!(pending = self.reorder.pending_len(), "rotation deferred");
            return false;
        }
        let previous = self.dispatcher.allocator().session_id().clone();
        let Some(next) = self.dispatcher.rotate(now) else {
            debug!(
                outstanding = self.dispatcher.outstanding(),
                "rotation deferred"
            );
            return false;
        };
        self.reorder.reset();
        self.display.clear();
        self.timeouts.clear();
        self.rotation_requested = false;
        counter!(SESSION_ROTATIONS_TOTAL).increment(1);
        info!(%previous, session_id = %next, "sequence space rotated");
        true
    }

    fn is_drained(&self) -> bool {
        self.dispatcher.is_quiescent() && self.reorder.pending_len() == 0 && self.display.is_idle()
    }

    fn snapshot(&self) -> SessionSnapshot {
        let allocator = self.dispatcher.allocator();
        SessionSnapshot {
            session_id: allocator.session_id().clone(),
            generation: allocator.generation(),
            next_sequence: allocator.peek(),
            expected_sequence: self.reorder.expected(),
            pending: self.reorder.pending_len(),
            outstanding: self.dispatcher.outstanding(),
            in_flight: self.dispatcher.in_flight(),
            lanes: self.display.snapshot(),
        }
    }
}

async fn sleep_until(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use lingo_backend::{MockBackend, MockReply};

    use crate::notify::{RecordingNotifier, RecordingRenderer};

    struct Harness {
        handle: SessionHandle,
        renderer: Arc<RecordingRenderer>,
        notifier: Arc<RecordingNotifier>,
    }

    fn start(config: SessionConfig, backend: MockBackend) -> Harness {
        let renderer = Arc::new(RecordingRenderer::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let handle = Session::spawn(
            config,
            Arc::new(backend),
            Arc::clone(&renderer) as Arc<dyn Renderer>,
            Arc::clone(&notifier) as Arc<dyn StatusNotifier>,
        );
        Harness {
            handle,
            renderer,
            notifier,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn submit_translates_and_renders() {
        let h = start(SessionConfig::with_channels(&["en", "ja"]), MockBackend::new());
        let outcome = h.handle.submit("hello").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Accepted(SequenceId::FIRST));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(h.renderer.texts("en"), ["[en] hello"]);
        assert_eq!(h.renderer.texts("ja"), ["[ja] hello"]);
    }

    #[tokio::test(start_paused = true)]
    async fn rejections_do_not_consume_ids() {
        let h = start(SessionConfig::default(), MockBackend::new());
        assert_eq!(
            h.handle.submit("").await.unwrap(),
            SubmitOutcome::Rejected(RejectReason::Empty)
        );
        assert_eq!(
            h.handle.submit("uh").await.unwrap(),
            SubmitOutcome::Rejected(RejectReason::Filler)
        );
        assert_eq!(
            h.handle.submit("real words").await.unwrap(),
            SubmitOutcome::Accepted(SequenceId::FIRST)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn submit_to_targets_a_subset() {
        let h = start(SessionConfig::with_channels(&["en", "ja"]), MockBackend::new());
        let _ = h.handle.submit_to("hi", &["ja".into()]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(h.renderer.texts("en").is_empty());
        assert_eq!(h.renderer.texts("ja"), ["[ja] hi"]);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_channel_gets_one_lane_and_stays_responsive() {
        let h = start(SessionConfig::with_channels(&["en", "en"]), MockBackend::new());
        let _ = h.handle.submit("hello").await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let started = Instant::now();
        let snap = h.handle.snapshot().await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(100));
        assert_eq!(snap.lanes.len(), 1);
        assert_eq!(snap.lanes[0].buffered, 0);
        assert_eq!(h.renderer.texts("en"), ["[en] hello"]);

        h.handle.shutdown().await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_notice_and_recovery() {
        let mut config = SessionConfig::default();
        config.failure_notice_threshold = 2;
        let backend = MockBackend::new()
            .with_reply("bad one", MockReply::fail(Duration::ZERO))
            .with_reply("bad two", MockReply::fail(Duration::ZERO))
            .with_reply("bad three", MockReply::fail(Duration::ZERO));
        let h = start(config, backend);

        for text in ["bad one", "bad two", "bad three"] {
            let _ = h.handle.submit(text).await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(
            h.notifier.messages(),
            ["translation backend unavailable: 2 consecutive requests failed"]
        );

        let _ = h.handle.submit("good").await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(h.notifier.messages().len(), 2);
        assert_eq!(h.notifier.messages()[1], "translation backend recovered");
        assert!(h.renderer.texts("en").contains(&"[en] good".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_request_does_not_block_successors() {
        let backend = MockBackend::new().with_reply("lost", MockReply::fail(Duration::ZERO));
        let h = start(SessionConfig::default(), backend);
        let _ = h.handle.submit("lost").await.unwrap();
        let _ = h.handle.submit("kept").await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let snap = h.handle.snapshot().await.unwrap();
        assert_eq!(snap.expected_sequence, SequenceId::new(3));
        assert_eq!(h.renderer.texts("en"), ["[en] kept"]);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_drains_and_closes() {
        let h = start(
            SessionConfig::default(),
            MockBackend::with_default_delay(Duration::from_millis(500)),
        );
        let _ = h.handle.submit("one").await.unwrap();
        let _ = h.handle.submit("two").await.unwrap();
        h.handle.shutdown().await.unwrap();

        assert_eq!(h.renderer.texts("en"), ["[en] one", "[en] two"]);
        assert_matches!(h.handle.submit("late").await, Err(LingoError::SessionClosed));
    }
}
