//! Wire types for the HTTP translation endpoint.
//!
//! Request: `{ "text": "...", "channels": ["en", "ja"], "sequenceId": 7 }`
//! Response: `{ "translations": ["...", "..."], "sequenceId": 7 }`
//! (`sequenceId` in the response is optional; when present it must match.)

use serde::{Deserialize, Serialize};

use lingo_core::{ChannelId, SequenceId, TranslationRequest};

/// Body posted to the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequestBody {
    /// Transcript text.
    pub text: String,
    /// Target channels, in answer order.
    pub channels: Vec<ChannelId>,
    /// Sequence id of the request.
    pub sequence_id: SequenceId,
}

impl From<&TranslationRequest> for TranslateRequestBody {
    fn from(req: &TranslationRequest) -> Self {
        Self {
            text: req.text.clone(),
            channels: req.channels.clone(),
            sequence_id: req.sequence_id,
        }
    }
}

/// Body returned by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponseBody {
    /// One translation per requested channel, same order.
    pub translations: Vec<String>,
    /// Echo of the request's sequence id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_id: Option<SequenceId>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
