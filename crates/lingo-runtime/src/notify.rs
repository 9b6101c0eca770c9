//! Rendering and status collaborators.
//!
//! The session calls these synchronously from its event loop, so
//! implementations must return quickly (hand off to a channel or write a line).

use parking_lot::Mutex;
use tokio::time::Instant;

use lingo_core::DisplayFrame;

/// Receives a frame whenever a channel's visible text changes.
pub trait Renderer: Send + Sync {
    /// Show `frame` on its channel.
    fn render(&self, frame: &DisplayFrame);
}

/// Receives transient human-readable notices.
pub trait StatusNotifier: Send + Sync {
    /// Surface `message` to the user.
    fn notify(&self, message: &str);
}

/// Renderer that keeps every frame with the instant it arrived.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    frames: Mutex<Vec<(Instant, DisplayFrame)>>,
}

impl RecordingRenderer {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames received so far, oldest first.
    pub fn frames(&self) -> Vec<(Instant, DisplayFrame)> {
        self.frames.lock().clone()
    }

    /// Texts received for `channel`, oldest first.
    pub fn texts(&self, channel: &str) -> Vec<String> {
        self.frames
            .lock()
            .iter()
            .filter(|(_, f)| f.channel.as_str() == channel)
            .map(|(_, f)| f.text.clone())
            .collect()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&self, frame: &DisplayFrame) {
        self.frames.lock().push((Instant::now(), frame.clone()));
    }
}

/// Notifier that keeps every message.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages received so far, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl StatusNotifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

/// Notifier that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl StatusNotifier for LogNotifier {
    fn notify(&self, message: &str) {
        tracing::info!(message, "status notice");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
