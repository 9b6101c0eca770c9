//! Error taxonomy for the translation delivery pipeline.
//!
//! None of these ever halt a session. They exist so that every failure has a
//! name, a log level, and a metric label:
//!
//! | Variant | Level | Effect |
//! |---------|-------|--------|
//! | `InvalidInput` | debug | request never submitted, no sequence id consumed |
//! | `Transport` | warn | request failed, channel keeps its previous frame |
//! | `Timeout` | info | reorder cursor forced forward |
//! | `BufferOverflow` | warn | oldest entry evicted / submission refused |
//! | `StaleResult` | debug | late result discarded |
//! | `SessionClosed` | warn | the session loop is gone |

use thiserror::Error;

use crate::ids::SequenceId;
use crate::input::RejectReason;

/// Pipeline error taxonomy.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LingoError {
    /// Empty, filler-only, or otherwise unacceptable transcript.
    #[error("invalid input: {0}")]
    InvalidInput(RejectReason),

    /// Backend call failed (network, non-2xx status, malformed payload).
    #[error("transport error for seq {seq}: {message}")]
    Transport {
        /// Sequence id of the failed request.
        seq: SequenceId,
        /// Human-readable cause.
        message: String,
    },

    /// A head-of-line result did not arrive in time.
    #[error("head-of-line timeout for seq {0}")]
    Timeout(SequenceId),

    /// A bounded buffer was full.
    #[error("{buffer} buffer full (capacity {capacity})")]
    BufferOverflow {
        /// Which buffer overflowed (`"reorder"`, `"channel"`, `"admission"`).
        buffer: &'static str,
        /// Its configured capacity.
        capacity: usize,
    },

    /// A result arrived behind the reorder cursor.
    #[error("stale result for seq {seq} (cursor at {expected})")]
    StaleResult {
        /// Sequence id of the late result.
        seq: SequenceId,
        /// Cursor position when it arrived.
        expected: SequenceId,
    },

    /// The session event loop has shut down.
    #[error("session closed")]
    SessionClosed,
}

impl LingoError {
    /// Short label used for metrics and structured log fields.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Transport { .. } => "transport",
            Self::Timeout(_) => "timeout",
            Self::BufferOverflow { .. } => "buffer_overflow",
            Self::StaleResult { .. } => "stale_result",
            Self::SessionClosed => "session_closed",
        }
    }

    /// Error for a refused submission. A full admission queue is an overflow
    /// of `queue_capacity`, not bad input.
    pub fn rejected(reason: RejectReason, queue_capacity: usize) -> Self {
        match reason {
            RejectReason::QueueFull => Self::BufferOverflow {
                buffer: "admission",
                capacity: queue_capacity,
            },
            other => Self::InvalidInput(other),
        }
    }
}

/// Result type for lingo operations.
pub type Result<T> = std::result::Result<T, LingoError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_display_includes_seq() {
        let err = LingoError::Transport {
            seq: SequenceId::new(4),
            message: "status 502".into(),
        };
        assert_eq!(err.to_string(), "transport error for seq 4: status 502");
    }

    #[test]
    fn overflow_display() {
        let err = LingoError::BufferOverflow {
            buffer: "reorder",
            capacity: 10,
        };
        assert_eq!(err.to_string(), "reorder buffer full (capacity 10)");
    }

    #[test]
    fn stale_display() {
        let err = LingoError::StaleResult {
            seq: SequenceId::new(1),
            expected: SequenceId::new(2),
        };
        assert!(err.to_string().contains("cursor at 2"));
    }

    #[test]
    fn rejections_map_to_input_or_overflow() {
        let err = LingoError::rejected(RejectReason::Filler, 64);
        assert_eq!(err, LingoError::InvalidInput(RejectReason::Filler));
        assert_eq!(err.category(), "invalid_input");

        let err = LingoError::rejected(RejectReason::QueueFull, 64);
        assert_eq!(err.category(), "buffer_overflow");
        assert_eq!(err.to_string(), "admission buffer full (capacity 64)");
    }

    #[test]
    fn categories_are_snake_case() {
        let errs = [
            LingoError::InvalidInput(RejectReason::Empty),
            LingoError::Transport {
                seq: SequenceId::FIRST,
                message: String::new(),
            },
            LingoError::Timeout(SequenceId::FIRST),
            LingoError::BufferOverflow {
                buffer: "channel",
                capacity: 1,
            },
            LingoError::StaleResult {
                seq: SequenceId::FIRST,
                expected: SequenceId::FIRST,
            },
            LingoError::SessionClosed,
        ];
        for e in &errs {
            let c = e.category();
            assert!(c.chars().all(|ch| ch.is_ascii_lowercase() || ch == '_'), "{c}");
        }
    }
}
