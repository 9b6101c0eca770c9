//! Terminal renderer and notifier.

use std::io::Write;

use lingo_core::DisplayFrame;
use lingo_runtime::{Renderer, StatusNotifier};

/// Render a frame as one line: `[channel] text`, plus ` (long)` when over-length.
pub fn format_frame(frame: &DisplayFrame) -> String {
    if frame.is_over_length {
        format!("[{}] {} (long)", frame.channel, frame.text)
    } else {
        format!("[{}] {}", frame.channel, frame.text)
    }
}

/// Writes frames to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutRenderer;

impl Renderer for StdoutRenderer {
    fn render(&self, frame: &DisplayFrame) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", format_frame(frame));
        let _ = out.flush();
    }
}

/// Writes notices to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrNotifier;

impl StatusNotifier for StderrNotifier {
    fn notify(&self, message: &str) {
        let _ = writeln!(std::io::stderr().lock(), "lingo: {message}");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
