//! Text buffer: the document being edited.
//!
//! A `Buffer` wraps a [`ropey::Rope`] with the small set of operations the
//! cursor model needs, plus file load/save and metadata (path, modified
//! flag, line ending style).
//!
//! # Line endings
//!
//! In memory the text always uses `\n`. Files are normalized on load and
//! the detected style is written back on save, so a CRLF file stays CRLF.
//! Keeping one separator means a line's content length is simply its char
//! count minus one, and the highlighter never sees a stray `\r`.
//!
//! # Coordinates
//!
//! Positions are 0-indexed (line, col) with columns in chars. Every editing
//! method clamps its positions into the buffer instead of panicking; the
//! cursor model keeps them valid anyway.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use ropey::{Rope, RopeSlice};
use tracing::{debug, info};

use crate::error::FileError;
use crate::position::Position;

// ---------------------------------------------------------------------------
// Line ending detection
// ---------------------------------------------------------------------------

/// Line ending style of a file, decided by its first line break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
    /// `\r`
    Cr,
}

impl LineEnding {
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::Cr => "\r",
        }
    }

    /// Style of the first line break in `text`; `Lf` if there is none.
    #[must_use]
    pub fn detect(text: &str) -> Self {
        let bytes = text.as_bytes();
        match bytes.iter().position(|&b| b == b'\n' || b == b'\r') {
            Some(i) if bytes[i] == b'\n' => Self::Lf,
            Some(i) if bytes.get(i + 1) == Some(&b'\n') => Self::CrLf,
            Some(_) => Self::Cr,
            None => Self::Lf,
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lf => "LF",
            Self::CrLf => "CRLF",
            Self::Cr => "CR",
        })
    }
}

/// Rewrite every `\r\n` and lone `\r` in `text` as `\n`.
#[must_use]
pub fn normalize_line_endings(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_owned();
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\r' {
            out.push('\n');
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
        } else {
            out.push(ch);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Buffer
// ---------------------------------------------------------------------------

/// The document: rope text plus where it came from.
///
/// An empty buffer has exactly one (empty) line.
#[derive(Clone)]
pub struct Buffer {
    rope: Rope,
    path: Option<PathBuf>,
    modified: bool,
    line_ending: LineEnding,
}

impl Buffer {
    // -- Construction -------------------------------------------------------

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A buffer holding `text`, line endings normalized.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            line_ending: LineEnding::detect(text),
            rope: Rope::from_str(&normalize_line_endings(text)),
            ..Self::default()
        }
    }

    /// An empty buffer that will be saved to `path`.
    #[must_use]
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Load a UTF-8 file.
    ///
    /// # Errors
    ///
    /// [`FileError::NotFound`] when the file doesn't exist,
    /// [`FileError::InvalidUtf8`] for non-UTF-8 content, and
    /// [`FileError::Read`] for anything else.
    pub fn from_file(path: &Path) -> Result<Self, FileError> {
        let text = fs::read_to_string(path).map_err(|e| FileError::from_read(path, e))?;
        let mut buffer = Self::from_text(&text);
        buffer.path = Some(path.to_path_buf());
        info!(
            path = %path.display(),
            lines = buffer.line_count(),
            line_ending = %buffer.line_ending,
            "loaded file"
        );
        Ok(buffer)
    }

    // -- Text access --------------------------------------------------------

    #[inline]
    #[must_use]
    pub const fn rope(&self) -> &Rope {
        &self.rope
    }

    /// Number of lines. A trailing `\n` starts one more, empty, line.
    #[inline]
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    #[inline]
    #[must_use]
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    #[inline]
    #[must_use]
    pub fn len_bytes(&self) -> usize {
        self.rope.len_bytes()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// A line including its trailing `\n`, if it exists.
    #[must_use]
    pub fn line(&self, line: usize) -> Option<RopeSlice<'_>> {
        (line < self.rope.len_lines()).then(|| self.rope.line(line))
    }

    /// Chars in `line` excluding the `\n`; 0 for lines past the end.
    ///
    /// The cursor may sit anywhere in `0..=line_len(line)`.
    #[must_use]
    pub fn line_len(&self, line: usize) -> usize {
        self.line(line).map_or(0, |slice| {
            let total = slice.len_chars();
            if total > 0 && slice.char(total - 1) == '\n' {
                total - 1
            } else {
                total
            }
        })
    }

    /// The whole text, with `\n` separators.
    #[must_use]
    pub fn contents(&self) -> String {
        self.rope.to_string()
    }

    /// Byte offset where `line` starts; `len_bytes()` for lines past the end.
    #[must_use]
    pub fn line_to_byte(&self, line: usize) -> usize {
        if line >= self.line_count() {
            self.rope.len_bytes()
        } else {
            self.rope.line_to_byte(line)
        }
    }

    // -- Coordinates --------------------------------------------------------

    /// Nearest valid cursor position: line within the buffer, column at
    /// most the line's content length.
    #[must_use]
    pub fn clamp_position(&self, pos: Position) -> Position {
        let line = pos.line.min(self.line_count().saturating_sub(1));
        Position::new(line, pos.col.min(self.line_len(line)))
    }

    /// Absolute char index of `pos` after clamping.
    #[must_use]
    pub fn char_idx(&self, pos: Position) -> usize {
        let pos = self.clamp_position(pos);
        self.rope.line_to_char(pos.line) + pos.col
    }

    // -- Editing ------------------------------------------------------------

    /// Insert `text` at `pos`. Line endings in `text` are normalized.
    pub fn insert(&mut self, pos: Position, text: &str) {
        if text.is_empty() {
            return;
        }
        let idx = self.char_idx(pos);
        self.rope.insert(idx, &normalize_line_endings(text));
        self.modified = true;
    }

    /// Remove the text between two positions, in either order.
    pub fn remove(&mut self, a: Position, b: Position) {
        let (start, end) = {
            let a = self.char_idx(a);
            let b = self.char_idx(b);
            (a.min(b), a.max(b))
        };
        if start == end {
            return;
        }
        self.rope.remove(start..end);
        self.modified = true;
    }

    // -- Metadata -----------------------------------------------------------

    #[inline]
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// True if the text changed since load or the last save.
    #[inline]
    #[must_use]
    pub const fn is_modified(&self) -> bool {
        self.modified
    }

    #[inline]
    #[must_use]
    pub const fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    // -- File I/O -----------------------------------------------------------

    /// Write the buffer to its path in its line ending style.
    ///
    /// # Errors
    ///
    /// [`FileError::NoPath`] if the buffer was never given a path,
    /// [`FileError::Write`] if writing fails.
    pub fn save(&mut self) -> Result<(), FileError> {
        let path = self.path.clone().ok_or(FileError::NoPath)?;
        self.save_as(&path)
    }

    /// Write the buffer to `path` and remember it as the buffer's path.
    ///
    /// # Errors
    ///
    /// [`FileError::Write`] if writing fails.
    pub fn save_as(&mut self, path: &Path) -> Result<(), FileError> {
        let content = self.text_with_line_endings();
        fs::write(path, &content).map_err(|e| {
            debug!(path = %path.display(), error = %e, "save failed");
            FileError::from_write(path, e)
        })?;
        info!(path = %path.display(), bytes = content.len(), "saved file");
        self.path = Some(path.to_path_buf());
        self.modified = false;
        Ok(())
    }

    fn text_with_line_endings(&self) -> String {
        let text = self.rope.to_string();
        match self.line_ending {
            LineEnding::Lf => text,
            other => text.replace('\n', other.as_str()),
        }
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self {
            rope: Rope::new(),
            path: None,
            modified: false,
            line_ending: LineEnding::Lf,
        }
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("lines", &self.line_count())
            .field("chars", &self.len_chars())
            .field("modified", &self.modified)
            .field("line_ending", &self.line_ending)
            .field("path", &self.path)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // -- LineEnding ---------------------------------------------------------

    #[test]
    fn detect_first_break_wins() {
        assert_eq!(LineEnding::detect("a\nb\r\n"), LineEnding::Lf);
        assert_eq!(LineEnding::detect("a\r\nb\n"), LineEnding::CrLf);
        assert_eq!(LineEnding::detect("a\rb"), LineEnding::Cr);
        assert_eq!(LineEnding::detect("none"), LineEnding::Lf);
        assert_eq!(LineEnding::detect(""), LineEnding::Lf);
    }

    #[test]
    fn trailing_cr_is_cr() {
        assert_eq!(LineEnding::detect("a\r"), LineEnding::Cr);
    }

    #[test]
    fn line_ending_display() {
        assert_eq!(LineEnding::CrLf.to_string(), "CRLF");
    }

    #[test]
    fn normalize_mixed() {
        assert_eq!(normalize_line_endings("a\r\nb\rc\nd"), "a\nb\nc\nd");
        assert_eq!(normalize_line_endings("é\r\n中"), "é\n中");
        assert_eq!(normalize_line_endings("plain"), "plain");
    }

    // -- Construction -------------------------------------------------------

    #[test]
    fn empty_buffer_has_one_line() {
        let buf = Buffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.line_count(), 1);
        assert_eq!(buf.line_len(0), 0);
        assert!(!buf.is_modified());
        assert!(buf.path().is_none());
    }

    #[test]
    fn from_text_normalizes() {
        let buf = Buffer::from_text("ab\r\ncd\r\n");
        assert_eq!(buf.contents(), "ab\ncd\n");
        assert_eq!(buf.line_ending(), LineEnding::CrLf);
        assert_eq!(buf.line_count(), 3);
        assert!(!buf.is_modified());
    }

    #[test]
    fn with_path_is_empty() {
        let buf = Buffer::with_path("new.py");
        assert!(buf.is_empty());
        assert_eq!(buf.path(), Some(Path::new("new.py")));
    }

    // -- Access -------------------------------------------------------------

    #[test]
    fn line_len_excludes_newline() {
        let buf = Buffer::from_text("hello\nhi\n");
        assert_eq!(buf.line_len(0), 5);
        assert_eq!(buf.line_len(1), 2);
        assert_eq!(buf.line_len(2), 0);
        assert_eq!(buf.line_len(99), 0);
    }

    #[test]
    fn line_len_counts_chars() {
        let buf = Buffer::from_text("café 中文");
        assert_eq!(buf.line_len(0), 7);
    }

    #[test]
    fn only_line_feed_breaks_lines() {
        // Form feeds show up in Python sources; none of these split a line.
        let buf = Buffer::from_text("x = 1\x0cy = 2\u{2028}z\u{2029}\u{85}\x0b");
        assert_eq!(buf.line_count(), 1);
        assert_eq!(buf.line_len(0), 16);
    }

    #[test]
    fn line_to_byte_offsets() {
        let buf = Buffer::from_text("é\nab\n");
        assert_eq!(buf.line_to_byte(0), 0);
        assert_eq!(buf.line_to_byte(1), 3);
        assert_eq!(buf.line_to_byte(2), 6);
        assert_eq!(buf.line_to_byte(10), 6);
    }

    #[test]
    fn clamp_position_into_buffer() {
        let buf = Buffer::from_text("abc\nd");
        assert_eq!(buf.clamp_position(Position::new(0, 9)), Position::new(0, 3));
        assert_eq!(buf.clamp_position(Position::new(7, 7)), Position::new(1, 1));
        assert_eq!(Buffer::new().clamp_position(Position::new(3, 3)), Position::ZERO);
    }

    #[test]
    fn char_idx_clamps() {
        let buf = Buffer::from_text("abc\nd");
        assert_eq!(buf.char_idx(Position::new(1, 0)), 4);
        assert_eq!(buf.char_idx(Position::new(0, 50)), 3);
    }

    // -- Editing ------------------------------------------------------------

    #[test]
    fn insert_marks_modified() {
        let mut buf = Buffer::from_text("ac");
        buf.insert(Position::new(0, 1), "b");
        assert_eq!(buf.contents(), "abc");
        assert!(buf.is_modified());
    }

    #[test]
    fn insert_empty_is_noop() {
        let mut buf = Buffer::from_text("a");
        buf.insert(Position::ZERO, "");
        assert!(!buf.is_modified());
    }

    #[test]
    fn insert_normalizes_crlf() {
        let mut buf = Buffer::new();
        buf.insert(Position::ZERO, "x\r\ny");
        assert_eq!(buf.contents(), "x\ny");
    }

    #[test]
    fn remove_either_order() {
        let mut buf = Buffer::from_text("ab\ncd");
        buf.remove(Position::new(1, 0), Position::new(0, 2));
        assert_eq!(buf.contents(), "abcd");

        let mut buf = Buffer::from_text("hello");
        buf.remove(Position::new(0, 1), Position::new(0, 3));
        assert_eq!(buf.contents(), "hlo");
    }

    #[test]
    fn remove_empty_range_is_noop() {
        let mut buf = Buffer::from_text("x");
        buf.remove(Position::ZERO, Position::ZERO);
        assert!(!buf.is_modified());
    }

    // -- File I/O -----------------------------------------------------------

    #[test]
    fn load_and_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.py");
        fs::write(&path, "def f():\n    pass\n").unwrap();

        let mut buf = Buffer::from_file(&path).unwrap();
        assert_eq!(buf.line_count(), 3);
        buf.insert(Position::ZERO, "# hi\n");
        buf.save().unwrap();

        assert!(!buf.is_modified());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "# hi\ndef f():\n    pass\n"
        );
    }

    #[test]
    fn save_restores_crlf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("win.txt");
        fs::write(&path, "a\r\nb\r\n").unwrap();

        let mut buf = Buffer::from_file(&path).unwrap();
        assert_eq!(buf.contents(), "a\nb\n");
        buf.insert(Position::new(2, 0), "c\n");
        buf.save().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\r\nb\r\nc\r\n");
    }

    #[test]
    fn save_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.py");
        let mut buf = Buffer::with_path(&path);
        buf.insert(Position::ZERO, "x = 1");
        buf.save().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "x = 1");
    }

    #[test]
    fn save_without_path() {
        let err = Buffer::from_text("x").save().unwrap_err();
        assert!(matches!(err, FileError::NoPath));
    }

    #[test]
    fn save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no/such/dir/f.txt");
        let mut buf = Buffer::from_text("x");
        let err = buf.save_as(&path).unwrap_err();
        assert!(matches!(err, FileError::Write { .. }));
        assert!(buf.path().is_none());
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Buffer::from_file(&dir.path().join("nope.py")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn load_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bin");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        let err = Buffer::from_file(&path).unwrap_err();
        assert!(matches!(err, FileError::InvalidUtf8 { .. }));
    }

    #[test]
    fn debug_format() {
        let s = format!("{:?}", Buffer::from_text("a\nb"));
        assert!(s.contains("lines: 2"));
    }
}
