//! # lingo-core
//!
//! Foundation types, errors, branded IDs, and input validation for the
//! Lingo translation scheduler.
//!
//! - **Branded IDs**: [`ids::SessionId`], [`ids::ChannelId`] as newtypes
//! - **Sequence ids**: [`ids::SequenceId`], strictly increasing within a session
//! - **Data model**: [`types::TranslationRequest`], [`types::TranslationResult`],
//!   [`types::DisplayItem`], [`types::CurrentDisplay`], [`types::DisplayFrame`]
//! - **Errors**: [`errors::LingoError`] taxonomy via `thiserror`
//! - **Input**: [`input::validate_transcript`] rejects empty and filler-only text
//! - **Logging**: [`logging::init_subscriber`] for the `tracing` subscriber
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other lingo crates.

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod input;
pub mod logging;
pub mod types;

pub use errors::{LingoError, Result};
pub use ids::{ChannelId, SequenceId, SessionId};
pub use input::{DEFAULT_FILLER_TOKENS, FillerSet, RejectReason, validate_transcript};
pub use types::{CurrentDisplay, DisplayFrame, DisplayItem, TranslationRequest, TranslationResult};
