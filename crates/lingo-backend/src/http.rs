//! JSON-over-HTTP translation backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, instrument, warn};

use lingo_core::TranslationRequest;

use crate::backend::TranslationBackend;
use crate::errors::{BackendError, BackendResult};
use crate::metrics::{ERRORS_TOTAL, REQUEST_DURATION_SECONDS};
use crate::types::{TranslateRequestBody, TranslateResponseBody};

/// Maximum bytes of an error body kept in [`BackendError::Status`].
const MAX_ERROR_BODY_BYTES: usize = 512;

/// HTTP backend configuration.
#[derive(Clone, Debug)]
pub struct HttpBackendConfig {
    /// Endpoint URL receiving `POST` requests.
    pub url: String,
    /// Optional bearer token.
    pub api_key: Option<String>,
    /// Per-call timeout enforced by the HTTP client.
    pub timeout: Duration,
}

impl HttpBackendConfig {
    /// Config with no auth and the given timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            timeout,
        }
    }
}

/// Translation backend that posts [`TranslateRequestBody`] as JSON.
pub struct HttpBackend {
    config: HttpBackendConfig,
    client: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend with its own HTTP client.
    pub fn new(config: HttpBackendConfig) -> BackendResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self { config, client })
    }

    /// Create a backend with a shared HTTP client.
    ///
    /// The client's own timeout applies; `config.timeout` is only used for
    /// error reporting.
    #[must_use]
    pub fn with_client(config: HttpBackendConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Configured endpoint.
    pub fn url(&self) -> &str {
        &self.config.url
    }

    fn build_headers(&self) -> BackendResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| BackendError::InvalidConfig(format!("api key header: {e}")))?;
            let _ = headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn map_send_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout(self.config.timeout.as_millis() as u64)
        } else {
            BackendError::Http(e)
        }
    }

    async fn call(&self, request: &TranslationRequest) -> BackendResult<Vec<String>> {
        let body = TranslateRequestBody::from(request);
        let headers = self.build_headers()?;

        let response = self
            .client
            .post(&self.config.url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: truncate_body(&text, MAX_ERROR_BODY_BYTES).to_string(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.map_send_error(e))?;
        let parsed: TranslateResponseBody = serde_json::from_slice(&bytes)
            .map_err(|e| BackendError::Malformed(e.to_string()))?;

        if let Some(echo) = parsed.sequence_id {
            if echo != request.sequence_id {
                return Err(BackendError::Malformed(format!(
                    "response sequence id {echo} does not match request {}",
                    request.sequence_id
                )));
            }
        }
        if parsed.translations.len() != request.channels.len() {
            return Err(BackendError::ChannelMismatch {
                expected: request.channels.len(),
                actual: parsed.translations.len(),
            });
        }
        Ok(parsed.translations)
    }
}

#[async_trait]
impl TranslationBackend for HttpBackend {
    #[instrument(skip_all, fields(seq = %request.sequence_id))]
    async fn translate(&self, request: &TranslationRequest) -> BackendResult<Vec<String>> {
        let started = Instant::now();
        debug!(
            url = %self.config.url,
            channels = request.channels.len(),
            chars = request.text.chars().count(),
            "sending translation request"
        );
        let result = self.call(request).await;
        histogram!(REQUEST_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        if let Err(e) = &result {
            counter!(ERRORS_TOTAL, "category" => e.category()).increment(1);
            warn!(error = %e, retryable = e.is_retryable(), "translation request failed");
        }
        result
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Truncate to at most `max_bytes` at a char boundary.
fn truncate_body(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
