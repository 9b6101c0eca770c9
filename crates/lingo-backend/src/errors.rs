//! Backend error types.

use thiserror::Error;

/// Errors from a single backend call.
///
/// Every variant is a TransportError in the pipeline taxonomy: the request
/// is considered failed and the session keeps running.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Connection, DNS, TLS, or body read failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response.
    #[error("backend returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },

    /// Response body was not the expected JSON shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Response carried a different number of translations than channels requested.
    #[error("expected {expected} translations, got {actual}")]
    ChannelMismatch {
        /// Channels requested.
        expected: usize,
        /// Translations returned.
        actual: usize,
    },

    /// The call exceeded the client timeout.
    #[error("backend call timed out after {0} ms")]
    Timeout(u64),

    /// The backend could not be configured (bad URL, bad header value).
    #[error("invalid backend config: {0}")]
    InvalidConfig(String),
}

impl BackendError {
    /// Short label for metrics and structured logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Status { .. } => "status",
            Self::Malformed(_) => "malformed",
            Self::ChannelMismatch { .. } => "channel_mismatch",
            Self::Timeout(_) => "timeout",
            Self::InvalidConfig(_) => "config",
        }
    }

    /// Whether retrying the same request could plausibly succeed.
    ///
    /// The dispatcher never retries (a retry would arrive behind the reorder
    /// cursor); this only feeds log fields and status notices.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Malformed(_) | Self::ChannelMismatch { .. } | Self::InvalidConfig(_) => false,
        }
    }
}

/// Result type for backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display() {
        let err = BackendError::Status {
            status: 503,
            body: "overloaded".into(),
        };
        assert_eq!(err.to_string(), "backend returned status 503: overloaded");
        assert_eq!(err.category(), "status");
    }

    #[test]
    fn mismatch_display() {
        let err = BackendError::ChannelMismatch {
            expected: 2,
            actual: 1,
        };
        assert_eq!(err.to_string(), "expected 2 translations, got 1");
    }

    #[test]
    fn retryable_classification() {
        let s = |status| BackendError::Status {
            status,
            body: String::new(),
        };
        assert!(s(500).is_retryable());
        assert!(s(429).is_retryable());
        assert!(!s(400).is_retryable());
        assert!(BackendError::Timeout(3000).is_retryable());
        assert!(!BackendError::Malformed("x".into()).is_retryable());
        assert!(
            !BackendError::ChannelMismatch {
                expected: 1,
                actual: 0
            }
            .is_retryable()
        );
    }
}
