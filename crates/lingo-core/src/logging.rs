//! Structured logging with `tracing`.
//!
//! Library code only emits `tracing` events; the host installs a subscriber
//! once at startup via [`init_subscriber`]. Session context (session id,
//! sequence id, channel) travels as span and event fields, not as formatted
//! message text.

use tracing_subscriber::EnvFilter;

/// Default filter when neither `RUST_LOG` nor a configured level is usable.
pub const DEFAULT_LEVEL: &str = "info";

/// Build the env filter: `RUST_LOG` wins, then `level`, then [`DEFAULT_LEVEL`].
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
}

/// Initialize the global tracing subscriber with stderr output only.
///
/// Call once at application startup. Subsequent calls are no-ops.
/// The subscriber writes compact human-readable output to stderr so that
/// stdout stays free for rendered frames.
pub fn init_subscriber(level: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // try_init is a no-op if a global subscriber is already set
    let _ = subscriber.try_init();
}

/// Initialize the global subscriber with JSON lines on stderr.
///
/// Same filter rules as [`init_subscriber`]; intended for hosts that ship
/// logs to a collector.
pub fn init_json_subscriber(level: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_writer(std::io::stderr)
        .json();

    let _ = subscriber.try_init();
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
