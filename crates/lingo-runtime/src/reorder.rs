//! Reorder buffer for backend results.
//!
//! Results are released strictly in sequence order starting at
//! [`SequenceId::FIRST`]. Out-of-order results wait in `pending` (bounded;
//! overflow evicts the smallest key). A head-of-line timeout moves the cursor
//! past a result that never arrived so later ones are not held back
//! indefinitely.
//!
//! Stale results, evictions, and forced skips are reported as
//! [`LingoError`] values: counted by category and logged, never returned.
//!
//! # Invariants
//!
//! - `expected` never decreases (except on [`ReorderBuffer::reset`]).
//! - Every key in `pending` is greater than `expected`.
//! - `pending.len() <= capacity`.
//!
//! The buffer is a plain state machine: it never touches the clock or the
//! display. Callers apply the returned `ready` results in order.

use std::collections::BTreeMap;

use metrics::counter;
use tracing::{debug, info, warn};

use lingo_core::{LingoError, SequenceId, TranslationResult};

use crate::metrics::{
    REORDER_EVICTIONS_TOTAL, REORDER_FORCED_SKIPS_TOTAL, REORDER_STALE_TOTAL, record_error,
};

/// What happened to a result handed to [`ReorderBuffer::on_result`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// It was the head of line and was released (possibly with successors).
    Released,
    /// It is ahead of the cursor and now waits in `pending`.
    Buffered {
        /// Pending entry dropped to stay within capacity, if any.
        evicted: Option<SequenceId>,
    },
    /// It is behind the cursor (its slot was skipped or already applied).
    Stale,
    /// A result with the same id is already pending.
    Duplicate,
}

/// Outcome of [`ReorderBuffer::on_result`].
#[derive(Debug)]
pub struct ReorderOutcome {
    /// What happened to the submitted result.
    pub disposition: Disposition,
    /// Results now applicable, in sequence order.
    pub ready: Vec<TranslationResult>,
}

/// Outcome of [`ReorderBuffer::on_timeout`].
#[derive(Debug, Default)]
pub struct TimeoutOutcome {
    /// Sequence id given up on, if the cursor was waiting for it.
    pub skipped: Option<SequenceId>,
    /// Results now applicable, in sequence order.
    pub ready: Vec<TranslationResult>,
}

/// Sequence-ordered holding area for backend results.
#[derive(Debug)]
pub struct ReorderBuffer {
    expected: SequenceId,
    pending: BTreeMap<SequenceId, TranslationResult>,
    capacity: usize,
}

impl ReorderBuffer {
    /// Empty buffer expecting [`SequenceId::FIRST`]. `capacity` is at least 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            expected: SequenceId::FIRST,
            pending: BTreeMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Next sequence id to be released.
    pub fn expected(&self) -> SequenceId {
        self.expected
    }

    /// Number of results waiting out of order.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Whether a result for `seq` is waiting.
    pub fn is_pending(&self, seq: SequenceId) -> bool {
        self.pending.contains_key(&seq)
    }

    /// Maximum number of pending results.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Accept a result from the backend.
    pub fn on_result(&mut self, result: TranslationResult) -> ReorderOutcome {
        let seq = result.sequence_id;

        if seq < self.expected {
            let err = LingoError::StaleResult {
                seq,
                expected: self.expected,
            };
            record_error(&err);
            counter!(REORDER_STALE_TOTAL).increment(1);
            debug!(error = %err, "stale result discarded");
            return ReorderOutcome {
                disposition: Disposition::Stale,
                ready: Vec::new(),
            };
        }

        if seq == self.expected {
            let mut ready = vec![result];
            self.expected = seq.next();
            self.drain_into(&mut ready);
            return ReorderOutcome {
                disposition: Disposition::Released,
                ready,
            };
        }

        if self.pending.contains_key(&seq) {
            debug!(%seq, "duplicate result discarded");
            return ReorderOutcome {
                disposition: Disposition::Duplicate,
                ready: Vec::new(),
            };
        }

        let _ = self.pending.insert(seq, result);
        let mut evicted = None;
        if self.pending.len() > self.capacity {
            if let Some((victim, _)) = self.pending.pop_first() {
                let err = LingoError::BufferOverflow {
                    buffer: "reorder",
                    capacity: self.capacity,
                };
                record_error(&err);
                counter!(REORDER_EVICTIONS_TOTAL).increment(1);
                warn!(
                    error = %err,
                    %victim,
                    expected = %self.expected,
                    "evicted oldest pending result"
                );
                evicted = Some(victim);
            }
        }
        ReorderOutcome {
            disposition: Disposition::Buffered { evicted },
            ready: Vec::new(),
        }
    }

    /// Head-of-line timeout for `seq`.
    ///
    /// Only acts while the cursor still waits for `seq`: the cursor moves
    /// past it and the usual cascading drain runs. Otherwise a no-op.
    pub fn on_timeout(&mut self, seq: SequenceId) -> TimeoutOutcome {
        let mut outcome = TimeoutOutcome::default();
        if self.expected != seq {
            return outcome;
        }

        let err = LingoError::Timeout(seq);
        record_error(&err);
        counter!(REORDER_FORCED_SKIPS_TOTAL).increment(1);
        outcome.skipped = Some(seq);
        self.expected = seq.next();
        self.drain_into(&mut outcome.ready);

        info!(
            error = %err,
            released = outcome.ready.len(),
            expected = %self.expected,
            "cursor forced forward"
        );
        outcome
    }

    /// Back to an empty buffer expecting [`SequenceId::FIRST`].
    pub fn reset(&mut self) {
        self.pending.clear();
        self.expected = SequenceId::FIRST;
    }

    fn drain_into(&mut self, ready: &mut Vec<TranslationResult>) {
        while let Some(next) = self.pending.remove(&self.expected) {
            ready.push(next);
            self.expected = self.expected.next();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
