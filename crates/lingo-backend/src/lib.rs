//! # lingo-backend
//!
//! The translation backend collaborator: submit text for a set of channels,
//! get back one string per channel keyed by the request's sequence id.
//!
//! - [`TranslationBackend`]: async trait the dispatcher's workers call
//! - [`HttpBackend`]: JSON-over-HTTP implementation (`reqwest`)
//! - [`MockBackend`]: scripted in-memory implementation for tests and demos
//! - [`BackendError`]: transport failures (never propagated past the dispatcher)
//!
//! ## Crate Position
//!
//! Depends on: lingo-core.
//! Depended on by: lingo-runtime, lingo-agent.

#![deny(unsafe_code)]

pub mod backend;
pub mod errors;
pub mod http;
pub mod metrics;
pub mod mock;
pub mod types;

pub use backend::TranslationBackend;
pub use errors::{BackendError, BackendResult};
pub use http::{HttpBackend, HttpBackendConfig};
pub use mock::{MockBackend, MockReply};
pub use types::{TranslateRequestBody, TranslateResponseBody};
