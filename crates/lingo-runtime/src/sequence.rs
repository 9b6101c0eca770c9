//! Per-session sequence id allocation.
//!
//! Ids start at [`SequenceId::FIRST`] and increase by one per admitted
//! request. Rotation starts a new sequence space: fresh [`SessionId`],
//! counter back to 1, generation bumped so completions from the old space
//! can be told apart.

use std::time::Duration;

use tokio::time::Instant;

use lingo_core::{SequenceId, SessionId};

/// Issues strictly increasing sequence ids for one session.
#[derive(Debug)]
pub struct SequenceAllocator {
    session_id: SessionId,
    generation: u64,
    next: SequenceId,
    started_at: Instant,
}

impl SequenceAllocator {
    /// Start the first sequence space at `now`.
    pub fn new(now: Instant) -> Self {
        Self {
            session_id: SessionId::new(),
            generation: 0,
            next: SequenceId::FIRST,
            started_at: now,
        }
    }

    /// Allocate the next id.
    pub fn allocate(&mut self) -> SequenceId {
        let id = self.next;
        self.next = id.next();
        id
    }

    /// The id the next call to [`allocate`](Self::allocate) returns.
    pub fn peek(&self) -> SequenceId {
        self.next
    }

    /// Number of ids issued in the current sequence space.
    pub fn issued(&self) -> u64 {
        self.next.get() - SequenceId::FIRST.get()
    }

    /// Current session id.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Rotation counter, starting at 0.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When the current sequence space started.
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Whether the sequence space is older than `interval`. `None` never rotates.
    pub fn is_rotation_due(&self, now: Instant, interval: Option<Duration>) -> bool {
        interval.is_some_and(|i| now.saturating_duration_since(self.started_at) >= i)
    }

    /// Start a new sequence space. Returns the new session id.
    pub fn rotate(&mut self, now: Instant) -> SessionId {
        self.session_id = SessionId::new();
        self.generation += 1;
        self.next = SequenceId::FIRST;
        self.started_at = now;
        self.session_id.clone()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
