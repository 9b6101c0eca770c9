//! Backend collaborator trait.

use async_trait::async_trait;

use lingo_core::TranslationRequest;

use crate::errors::BackendResult;

/// Translates one request into one string per requested channel.
///
/// Implementations must return exactly `request.channels.len()` strings in
/// channel order, or an error. They are called concurrently from the
/// dispatcher's worker pool and are never cancelled mid-call by the session.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Translate `request`.
    async fn translate(&self, request: &TranslationRequest) -> BackendResult<Vec<String>>;

    /// Short name for logs.
    fn name(&self) -> &str;
}
