//! Scripted in-memory backend.
//!
//! Replies are keyed by transcript text. Unscripted text gets the default
//! reply: `"[<channel>] <text>"` per channel after the default delay.
//! Delays use `tokio::time::sleep`, so tests running with a paused clock
//! control latency exactly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use lingo_core::{SequenceId, TranslationRequest};

use crate::backend::TranslationBackend;
use crate::errors::{BackendError, BackendResult};

/// Scripted outcome for one transcript.
#[derive(Clone, Debug)]
pub struct MockReply {
    /// Simulated latency.
    pub delay: Duration,
    /// `Some(texts)` to succeed, `None` to fail with a 503.
    pub translations: Option<Vec<String>>,
}

impl MockReply {
    /// Successful reply after `delay`.
    pub fn ok(delay: Duration, translations: &[&str]) -> Self {
        Self {
            delay,
            translations: Some(translations.iter().map(|s| (*s).to_string()).collect()),
        }
    }

    /// Failed reply (status 503) after `delay`.
    pub fn fail(delay: Duration) -> Self {
        Self {
            delay,
            translations: None,
        }
    }
}

/// Mock backend for tests and offline demos.
pub struct MockBackend {
    replies: Mutex<HashMap<String, MockReply>>,
    default_delay: Duration,
    calls: Mutex<Vec<(SequenceId, String)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockBackend {
    /// Mock with zero default latency.
    pub fn new() -> Self {
        Self::with_default_delay(Duration::ZERO)
    }

    /// Mock whose unscripted replies take `delay`.
    pub fn with_default_delay(delay: Duration) -> Self {
        Self {
            replies: Mutex::new(HashMap::new()),
            default_delay: delay,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Builder: script the reply for `text`.
    #[must_use]
    pub fn with_reply(self, text: &str, reply: MockReply) -> Self {
        self.script(text, reply);
        self
    }

    /// Script the reply for `text` (replaces an earlier script).
    pub fn script(&self, text: &str, reply: MockReply) {
        let _ = self.replies.lock().insert(text.to_string(), reply);
    }

    /// Calls received so far, in call order.
    pub fn calls(&self) -> Vec<(SequenceId, String)> {
        self.calls.lock().clone()
    }

    /// Number of calls received.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Calls currently in progress.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight counter on every exit path.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let _ = self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TranslationBackend for MockBackend {
    async fn translate(&self, request: &TranslationRequest) -> BackendResult<Vec<String>> {
        self.calls
            .lock()
            .push((request.sequence_id, request.text.clone()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        let scripted = self.replies.lock().get(&request.text).cloned();
        let reply = scripted.unwrap_or_else(|| MockReply {
            delay: self.default_delay,
            translations: Some(
                request
                    .channels
                    .iter()
                    .map(|c| format!("[{c}] {}", request.text))
                    .collect(),
            ),
        });

        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }

        match reply.translations {
            Some(t) if t.len() == request.channels.len() => Ok(t),
            Some(t) => Err(BackendError::ChannelMismatch {
                expected: request.channels.len(),
                actual: t.len(),
            }),
            None => Err(BackendError::Status {
                status: 503,
                body: "mock failure".into(),
            }),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
