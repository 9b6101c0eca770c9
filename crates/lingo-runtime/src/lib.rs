//! # lingo-runtime
//!
//! Sequenced translation delivery and display scheduling.
//!
//! - **Sequence**: [`SequenceAllocator`] issues per-session ids and rotates the sequence space
//! - **Dispatch**: [`RequestDispatcher`] validates, admits into a bounded queue, runs a fixed worker pool
//! - **Reorder**: [`ReorderBuffer`] releases results in sequence order, skips lost ones on timeout
//! - **Display**: [`DisplayScheduler`] keeps one lane per channel with minimum dwell time
//! - **Session**: [`Session`] owns all of the above on one event loop; [`SessionHandle`] talks to it
//!
//! ## Crate Position
//!
//! Depends on: lingo-core, lingo-settings, lingo-backend.
//! Depended on by: lingo-agent.

#![deny(unsafe_code)]

pub mod config;
pub mod dispatcher;
pub mod display;
pub mod metrics;
pub mod notify;
pub mod reorder;
pub mod sequence;
pub mod session;

pub use config::{DispatchConfig, DisplayConfig, LaneConfig, SessionConfig};
pub use dispatcher::{Admitted, CallOutcome, Completion, RequestDispatcher};
pub use display::{DisplayScheduler, LaneSnapshot, dwell_time};
pub use notify::{LogNotifier, RecordingNotifier, RecordingRenderer, Renderer, StatusNotifier};
pub use reorder::{Disposition, ReorderBuffer, ReorderOutcome, TimeoutOutcome};
pub use sequence::SequenceAllocator;
pub use session::{Session, SessionHandle, SessionSnapshot, SubmitOutcome};
