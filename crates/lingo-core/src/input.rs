//! Transcript admission checks.
//!
//! A transcript is rejected before it consumes a sequence id when it is empty
//! after trimming, or when it reduces to hesitation tokens only ("um", "えー").
//! Filler comparison ignores case and surrounding punctuation, both ASCII and
//! CJK (`、。！？…`).

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Default hesitation tokens (English and Japanese).
pub const DEFAULT_FILLER_TOKENS: &[&str] = &[
    "um", "umm", "uh", "uhh", "er", "err", "ah", "ahh", "hmm", "hm", "mm", "mmm", "えー", "えーと",
    "えっと", "あの", "あのー", "その", "まあ", "うーん", "うん", "ん",
];

/// Why a submission was refused without consuming a sequence id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Empty or whitespace-only text.
    Empty,
    /// Text consisting of filler tokens only.
    Filler,
    /// The admission queue is at capacity.
    QueueFull,
    /// None of the requested channels is configured for the session.
    UnknownChannel,
}

impl RejectReason {
    /// Metric / log label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Filler => "filler",
            Self::QueueFull => "queue_full",
            Self::UnknownChannel => "unknown_channel",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized set of filler tokens.
#[derive(Clone, Debug)]
pub struct FillerSet {
    tokens: HashSet<String>,
}

impl FillerSet {
    /// Build from raw tokens; each token is normalized the same way as input.
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens = tokens
            .into_iter()
            .map(|t| normalize_token(t.as_ref()))
            .filter(|t| !t.is_empty())
            .collect();
        Self { tokens }
    }

    /// Whether `token` (already normalized) is a filler.
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Whether `text` reduces to filler tokens only.
    ///
    /// Non-empty text qualifies when either the whole normalized string is a
    /// filler, or every word (split on whitespace and punctuation) is.
    pub fn is_filler_only(&self, text: &str) -> bool {
        let whole = normalize_token(text);
        if whole.is_empty() {
            return false;
        }
        if self.contains(&whole) {
            return true;
        }
        let mut words = text
            .split(|c: char| c.is_whitespace() || is_punctuation(c))
            .map(normalize_token)
            .filter(|w| !w.is_empty())
            .peekable();
        if words.peek().is_none() {
            return false;
        }
        words.all(|w| self.contains(&w))
    }
}

impl Default for FillerSet {
    fn default() -> Self {
        Self::new(DEFAULT_FILLER_TOKENS)
    }
}

/// Validate a transcript and return its trimmed form.
///
/// Returns [`RejectReason::Empty`] for blank text, [`RejectReason::Filler`]
/// for filler-only text.
pub fn validate_transcript<'a>(
    text: &'a str,
    fillers: &FillerSet,
) -> Result<&'a str, RejectReason> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.chars().all(is_punctuation) {
        return Err(RejectReason::Empty);
    }
    if fillers.is_filler_only(trimmed) {
        return Err(RejectReason::Filler);
    }
    Ok(trimmed)
}

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation()
        || matches!(
            c,
            '、' | '。' | '，' | '．' | '！' | '？' | '…' | '‥' | '〜' | '「' | '」' | '・'
        )
}

/// Lowercase and strip surrounding whitespace and punctuation.
fn normalize_token(s: &str) -> String {
    s.trim_matches(|c: char| c.is_whitespace() || is_punctuation(c))
        .to_lowercase()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
