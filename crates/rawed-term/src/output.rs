// SPDX-License-Identifier: MIT
//
// Output buffering and immediate flushing.
//
// The editor repaints the whole screen on every keystroke. Writing that
// frame as hundreds of small writes makes the terminal draw half-finished
// frames, so the frame is assembled in an `OutputBuffer` first and handed
// to the terminal with one write followed by an explicit flush.
//
// Raw mode turns off output post-processing (OPOST), which means a bare
// `\n` moves down without returning to column 0. Text destined for the
// screen goes through `push_text`, which expands line feeds to CR LF.

use std::io::{self, Write};

/// Default capacity: 16 KB, enough for most frames.
const DEFAULT_CAPACITY: usize = 16_384;

// ─── OutputBuffer ────────────────────────────────────────────────────────────

/// An in-memory frame that is written to the terminal in one go.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    buf: String,
}

impl OutputBuffer {
    /// Create an empty buffer with default capacity (16 KB).
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: String::with_capacity(DEFAULT_CAPACITY),
        }
    }

    /// Number of bytes accumulated.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the buffer is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated frame (for testing and debugging).
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Append an escape sequence or any text that contains no line feeds.
    #[inline]
    pub fn push_str(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    /// Append screen text, expanding each `\n` to `\r\n`.
    pub fn push_text(&mut self, text: &str) {
        let mut parts = text.split('\n');
        if let Some(first) = parts.next() {
            self.buf.push_str(first);
        }
        for part in parts {
            self.buf.push_str("\r\n");
            self.buf.push_str(part);
        }
    }

    /// Clear the buffer for reuse (keeps allocated capacity).
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Write accumulated output to an arbitrary writer and clear the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if !self.buf.is_empty() {
            flush(w, &self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Immediate flush ─────────────────────────────────────────────────────────

/// Write `text` and flush `w` right away.
///
/// # Errors
///
/// Returns an error if the write or the flush fails.
pub fn flush(w: &mut impl Write, text: &str) -> io::Result<()> {
    w.write_all(text.as_bytes())?;
    w.flush()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
