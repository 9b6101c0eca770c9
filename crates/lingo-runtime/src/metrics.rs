//! Metric names emitted through the `metrics` facade.
//!
//! No exporter is installed here; the host decides where these go.

use metrics::counter;

use lingo_core::LingoError;

/// Requests admitted (sequence id allocated).
pub const REQUESTS_TOTAL: &str = "translation_requests_total";
/// Backend calls that failed.
pub const FAILURES_TOTAL: &str = "translation_failures_total";
/// Submissions refused before admission, labelled by `reason`.
pub const REJECTED_TOTAL: &str = "translation_rejected_total";
/// Backend calls currently in progress.
pub const REQUESTS_ACTIVE: &str = "translation_requests_active";
/// Results discarded behind the reorder cursor.
pub const REORDER_STALE_TOTAL: &str = "reorder_stale_total";
/// Pending results evicted on reorder overflow.
pub const REORDER_EVICTIONS_TOTAL: &str = "reorder_evictions_total";
/// Sequence ids skipped by head-of-line timeouts.
pub const REORDER_FORCED_SKIPS_TOTAL: &str = "reorder_forced_skips_total";
/// Frames handed to the renderer, labelled by `channel`.
pub const DISPLAY_FRAMES_TOTAL: &str = "display_frames_total";
/// Buffered display items dropped, labelled by `reason` (`ttl`, `capacity`).
pub const DISPLAY_PURGED_TOTAL: &str = "display_purged_total";
/// Sequence space rotations.
pub const SESSION_ROTATIONS_TOTAL: &str = "session_rotations_total";
/// Pipeline errors of every kind, labelled by `category`.
pub const PIPELINE_ERRORS_TOTAL: &str = "pipeline_errors_total";

/// Count `err` under [`PIPELINE_ERRORS_TOTAL`].
pub(crate) fn record_error(err: &LingoError) {
    counter!(PIPELINE_ERRORS_TOTAL, "category" => err.category()).increment(1);
}
