//! Admission control and the backend worker pool.
//!
//! Submissions are validated, assigned a sequence id, and pushed onto a
//! bounded FIFO queue drained by exactly `max_concurrent` workers. A full
//! queue refuses the submission without consuming an id. Every admitted
//! request produces exactly one [`Completion`], successful or not, so the
//! session can count outstanding work without extra bookkeeping.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use metrics::{counter, gauge};
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use lingo_backend::TranslationBackend;
use lingo_core::{
    ChannelId, LingoError, RejectReason, SequenceId, SessionId, TranslationRequest,
    TranslationResult, validate_transcript,
};

use crate::config::DispatchConfig;
use crate::metrics::{
    FAILURES_TOTAL, REJECTED_TOTAL, REQUESTS_ACTIVE, REQUESTS_TOTAL, record_error,
};
use crate::sequence::SequenceAllocator;

/// How a backend call ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    /// The backend answered.
    Translated,
    /// The backend call failed; the result carries empty texts.
    Failed(LingoError),
    /// The head-of-line deadline passed while queued; no call was made.
    Expired,
}

/// A finished job, reported back to the session loop.
#[derive(Clone, Debug)]
pub struct Completion {
    /// Sequence space the request belonged to.
    pub generation: u64,
    /// Result to hand to the reorder buffer.
    pub result: TranslationResult,
    /// How the call ended.
    pub outcome: CallOutcome,
}

/// A request admitted but not yet completed.
#[derive(Clone, Debug)]
pub struct Admitted {
    /// Allocated sequence id.
    pub sequence_id: SequenceId,
    /// Head-of-line deadline.
    pub deadline: Instant,
}

#[derive(Debug)]
struct Job {
    generation: u64,
    request: TranslationRequest,
    deadline: Instant,
}

/// Decrements the active call count on drop.
struct ActiveCall {
    active: Arc<AtomicUsize>,
}

impl ActiveCall {
    fn start(active: &Arc<AtomicUsize>) -> Self {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        #[allow(clippy::cast_precision_loss)]
        gauge!(REQUESTS_ACTIVE).set(now as f64);
        Self {
            active: Arc::clone(active),
        }
    }
}

impl Drop for ActiveCall {
    fn drop(&mut self) {
        let now = self.active.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        #[allow(clippy::cast_precision_loss)]
        gauge!(REQUESTS_ACTIVE).set(now as f64);
    }
}

/// Admission control in front of a fixed worker pool.
///
/// Owned by the session loop; only the workers run elsewhere.
pub struct RequestDispatcher {
    config: DispatchConfig,
    allocator: SequenceAllocator,
    jobs: mpsc::Sender<Job>,
    outstanding: usize,
    active: Arc<AtomicUsize>,
    cancel: CancellationToken,
}

impl RequestDispatcher {
    /// Spawn the worker pool. Completions arrive on the returned receiver.
    pub fn start(
        config: DispatchConfig,
        backend: Arc<dyn TranslationBackend>,
        now: Instant,
    ) -> (Self, mpsc::Receiver<Completion>) {
        let workers = config.max_concurrent.max(1);
        let (jobs_tx, jobs_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (done_tx, done_rx) = mpsc::channel(config.queue_capacity.max(1) + workers);
        let jobs_rx = Arc::new(AsyncMutex::new(jobs_rx));
        let active = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        for worker in 0..workers {
            let _handle = tokio::spawn(run_worker(
                worker,
                Arc::clone(&jobs_rx),
                Arc::clone(&backend),
                done_tx.clone(),
                Arc::clone(&active),
                cancel.clone(),
            ));
        }
        debug!(workers, backend = backend.name(), "dispatcher started");

        let dispatcher = Self {
            config,
            allocator: SequenceAllocator::new(now),
            jobs: jobs_tx,
            outstanding: 0,
            active,
            cancel,
        };
        (dispatcher, done_rx)
    }

    /// Validate and enqueue `text`.
    ///
    /// `channels = None` uses every configured channel. An explicit list is
    /// filtered to configured channels, keeping its order.
    #[instrument(skip_all, fields(session_id = %self.allocator.session_id()))]
    pub fn submit(
        &mut self,
        text: &str,
        channels: Option<&[ChannelId]>,
        now: Instant,
    ) -> Result<Admitted, RejectReason> {
        let result = self.admit(text, channels, now);
        if let Err(reason) = &result {
            let reason = *reason;
            let err = LingoError::rejected(reason, self.config.queue_capacity);
            record_error(&err);
            counter!(REJECTED_TOTAL, "reason" => reason.as_str()).increment(1);
            if reason == RejectReason::QueueFull {
                warn!(error = %err, "submission refused");
            } else {
                debug!(error = %err, "submission rejected");
            }
        }
        result
    }

    fn admit(
        &mut self,
        text: &str,
        channels: Option<&[ChannelId]>,
        now: Instant,
    ) -> Result<Admitted, RejectReason> {
        let text = validate_transcript(text, &self.config.filler)?;
        let channels = self.resolve_channels(channels)?;

        let permit = self.jobs.try_reserve().map_err(|_| RejectReason::QueueFull)?;
        let sequence_id = self.allocator.allocate();
        let request = TranslationRequest {
            text: text.to_string(),
            channels,
            sequence_id,
            submitted_at: now,
        };
        let deadline = request.deadline(self.config.request_timeout);
        permit.send(Job {
            generation: self.allocator.generation(),
            request,
            deadline,
        });
        self.outstanding += 1;
        counter!(REQUESTS_TOTAL).increment(1);
        debug!(%sequence_id, outstanding = self.outstanding, "request admitted");
        Ok(Admitted {
            sequence_id,
            deadline,
        })
    }

    fn resolve_channels(
        &self,
        requested: Option<&[ChannelId]>,
    ) -> Result<Vec<ChannelId>, RejectReason> {
        let Some(requested) = requested else {
            return Ok(self.config.channels.clone());
        };
        let mut resolved: Vec<ChannelId> = Vec::with_capacity(requested.len());
        for ch in requested {
            if self.config.channels.contains(ch) && !resolved.contains(ch) {
                resolved.push(ch.clone());
            }
        }
        if resolved.is_empty() {
            return Err(RejectReason::UnknownChannel);
        }
        Ok(resolved)
    }

    /// Account for a completion. Returns `false` if it belongs to an older
    /// sequence space and must be discarded.
    pub fn on_completion(&mut self, completion: &Completion) -> bool {
        self.outstanding = self.outstanding.saturating_sub(1);
        completion.generation == self.allocator.generation()
    }

    /// Admitted requests not yet completed (queued or in flight).
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Backend calls currently in progress.
    pub fn in_flight(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Whether nothing is queued or in flight.
    pub fn is_quiescent(&self) -> bool {
        self.outstanding == 0
    }

    /// The session's sequence allocator.
    pub fn allocator(&self) -> &SequenceAllocator {
        &self.allocator
    }

    /// Start a new sequence space. Refused (returns `None`) unless quiescent.
    pub fn rotate(&mut self, now: Instant) -> Option<SessionId> {
        if !self.is_quiescent() {
            return None;
        }
        Some(self.allocator.rotate(now))
    }

    /// Configured channels, in answer order.
    pub fn channels(&self) -> &[ChannelId] {
        &self.config.channels
    }

    /// Stop the workers. In-progress backend calls finish first.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for RequestDispatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_worker(
    worker: usize,
    jobs: Arc<AsyncMutex<mpsc::Receiver<Job>>>,
    backend: Arc<dyn TranslationBackend>,
    done: mpsc::Sender<Completion>,
    active: Arc<AtomicUsize>,
    cancel: CancellationToken,
) {
    loop {
        let job = {
            let mut rx = jobs.lock().await;
            tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                job = rx.recv() => job,
            }
        };
        let Some(job) = job else { break };
        let completion = execute(backend.as_ref(), job, &active).await;
        if done.send(completion).await.is_err() {
            break;
        }
    }
    debug!(worker, "dispatcher worker stopped");
}

async fn execute(
    backend: &dyn TranslationBackend,
    job: Job,
    active: &Arc<AtomicUsize>,
) -> Completion {
    let Job {
        generation,
        request,
        deadline,
    } = job;
    let seq = request.sequence_id;

    if Instant::now() >= deadline {
        debug!(%seq, "deadline passed while queued, skipping backend call");
        return Completion {
            generation,
            result: TranslationResult::failed(seq, request.channels, Instant::now()),
            outcome: CallOutcome::Expired,
        };
    }

    let reply = {
        let _call = ActiveCall::start(active);
        backend.translate(&request).await
    };

    match reply {
        Ok(per_channel_text) => Completion {
            generation,
            result: TranslationResult {
                sequence_id: seq,
                channels: request.channels,
                per_channel_text,
                arrived_at: Instant::now(),
            },
            outcome: CallOutcome::Translated,
        },
        Err(e) => {
            let err = LingoError::Transport {
                seq,
                message: e.to_string(),
            };
            record_error(&err);
            counter!(FAILURES_TOTAL, "category" => e.category()).increment(1);
            warn!(error = %err, category = e.category(), "translation failed");
            Completion {
                generation,
                result: TranslationResult::failed(seq, request.channels, Instant::now()),
                outcome: CallOutcome::Failed(err),
            }
        }
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
    use std::time::Duration;

    use crate::config::SessionConfig;

    fn config(max_concurrent: usize, queue_capacity: usize) -> DispatchConfig {
        let mut cfg = SessionConfig::with_channels(&["en", "ja"]).dispatch;
        cfg.max_concurrent = max_concurrent;
        cfg.queue_capacity = queue_capacity;
        cfg
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_empty_and_filler_without_consuming_ids() {
        let backend = Arc::new(MockBackend::new());
        let (mut d, _rx) = RequestDispatcher::start(config(2, 4), backend, Instant::now());
        let now = Instant::now();
        assert_matches!(d.submit("   ", None, now), Err(RejectReason::Empty));
        assert_matches!(d.submit("um...", None, now), Err(RejectReason::Filler));
        assert_eq!(d.allocator().issued(), 0);

        let admitted = d.submit("hello", None, now).unwrap();
        assert_eq!(admitted.sequence_id, SequenceId::FIRST);
        assert_eq!(admitted.deadline, now + Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn completion_carries_texts_in_channel_order() {
        let backend = Arc::new(MockBackend::new());
        let (mut d, mut rx) = RequestDispatcher::start(config(2, 4), backend, Instant::now());
        let _ = d.submit("hello", None, Instant::now()).unwrap();

        let c = rx.recv().await.unwrap();
        assert_eq!(c.outcome, CallOutcome::Translated);
        assert_eq!(c.result.per_channel_text, ["[en] hello", "[ja] hello"]);
        assert!(d.on_completion(&c));
        assert!(d.is_quiescent());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_yields_empty_result() {
        let backend =
            Arc::new(MockBackend::new().with_reply("boom", MockReply::fail(Duration::ZERO)));
        let (mut d, mut rx) = RequestDispatcher::start(config(1, 4), backend, Instant::now());
        let _ = d.submit("boom", None, Instant::now()).unwrap();

        let c = rx.recv().await.unwrap();
        assert_matches!(
            &c.outcome,
            CallOutcome::Failed(LingoError::Transport { seq, message })
                if *seq == SequenceId::FIRST && message.contains("503")
        );
        assert!(c.result.is_empty());
        assert_eq!(c.result.sequence_id, SequenceId::FIRST);
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_refuses_without_consuming_id() {
        let backend = Arc::new(MockBackend::with_default_delay(Duration::from_secs(1)));
        let (mut d, _rx) = RequestDispatcher::start(config(1, 1), backend, Instant::now());
        let now = Instant::now();

        let _ = d.submit("one", None, now).unwrap();
        // Let the single worker take job one off the queue.
        tokio::time::sleep(Duration::from_millis(1)).await;
        let _ = d.submit("two", None, now).unwrap();
        assert_matches!(d.submit("three", None, now), Err(RejectReason::QueueFull));
        assert_eq!(d.allocator().peek(), SequenceId::new(3));
        assert_eq!(d.outstanding(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_never_exceeds_worker_count() {
        let backend = Arc::new(MockBackend::with_default_delay(Duration::from_millis(200)));
        let shared: Arc<dyn TranslationBackend> = Arc::clone(&backend) as _;
        let (mut d, mut rx) = RequestDispatcher::start(config(3, 20), shared, Instant::now());
        for i in 0..12 {
            let _ = d.submit(&format!("line {i}"), None, Instant::now()).unwrap();
        }
        for _ in 0..12 {
            let c = rx.recv().await.unwrap();
            let _ = d.on_completion(&c);
        }
        assert_eq!(backend.call_count(), 12);
        assert_eq!(backend.max_in_flight(), 3);
        assert_eq!(d.in_flight(), 0);
        assert!(d.is_quiescent());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_jobs_skip_the_backend() {
        let backend = Arc::new(MockBackend::with_default_delay(Duration::from_secs(4)));
        let shared: Arc<dyn TranslationBackend> = Arc::clone(&backend) as _;
        let (mut d, mut rx) = RequestDispatcher::start(config(1, 4), shared, Instant::now());
        let _ = d.submit("slow", None, Instant::now()).unwrap();
        let _ = d.submit("queued", None, Instant::now()).unwrap();

        assert_eq!(rx.recv().await.unwrap().outcome, CallOutcome::Translated);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.outcome, CallOutcome::Expired);
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_channels_are_filtered() {
        let backend = Arc::new(MockBackend::new());
        let (mut d, mut rx) = RequestDispatcher::start(config(1, 4), backend, Instant::now());
        let now = Instant::now();
        assert_matches!(
            d.submit("hi", Some(&["fr".into()]), now),
            Err(RejectReason::UnknownChannel)
        );
        let _ = d.submit("hi", Some(&["ja".into(), "fr".into(), "ja".into()]), now).unwrap();
        let c = rx.recv().await.unwrap();
        assert_eq!(c.result.channels, [ChannelId::from("ja")]);
    }

    #[tokio::test(start_paused = true)]
    async fn rotation_requires_quiescence() {
        let backend = Arc::new(MockBackend::with_default_delay(Duration::from_millis(10)));
        let (mut d, mut rx) = RequestDispatcher::start(config(1, 4), backend, Instant::now());
        let _ = d.submit("hello", None, Instant::now()).unwrap();
        assert!(d.rotate(Instant::now()).is_none());

        let c = rx.recv().await.unwrap();
        assert!(d.on_completion(&c));
        let before = d.allocator().session_id().clone();
        let after = d.rotate(Instant::now()).unwrap();
        assert_ne!(before, after);
        assert_eq!(d.allocator().peek(), SequenceId::FIRST);

        // A completion tagged with the old generation is refused.
        assert!(!d.on_completion(&c));
    }
}
