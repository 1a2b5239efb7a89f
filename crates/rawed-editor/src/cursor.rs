//! Cursor: the position where edits happen, and the only way text changes.
//!
//! The `Cursor` is a plain position. It doesn't own the buffer; every method
//! takes the buffer as a parameter, so a controller owns both side by side.
//!
//! Movement is non-modal: the cursor can sit after the last character of a
//! line (column == line length), which is where typed text is appended.
//!
//! # Invariant
//!
//! After every method, `line < buffer.line_count()` and
//! `col <= buffer.line_len(line)`. Each method first clamps the stored
//! position into the buffer, so even a buffer swapped out underneath the
//! cursor can't leave it dangling.
//!
//! Vertical moves clamp the column to the target line and do not remember
//! the column they came from.

use unicode_width::UnicodeWidthChar;

use crate::buffer::{Buffer, normalize_line_endings};
use crate::position::Position;

/// Terminals put a tab stop every 8 cells.
pub const TAB_STOP: usize = 8;

/// Cells `c` takes on screen when drawn starting at cell `at`.
///
/// A tab runs to the next tab stop. Other ASCII control characters are
/// drawn as a one-cell placeholder; zero-width characters take none.
#[must_use]
pub fn char_cells(c: char, at: usize) -> usize {
    match c {
        '\t' => TAB_STOP - at % TAB_STOP,
        c if c.is_ascii_control() => 1,
        c => c.width().unwrap_or(0),
    }
}

/// A cursor in a text buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pos: Position,
}

impl Cursor {
    /// A cursor at the origin.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pos: Position::ZERO,
        }
    }

    /// A cursor at `pos`. Clamped on first use.
    #[must_use]
    pub const fn at(pos: Position) -> Self {
        Self { pos }
    }

    // -- Accessors ----------------------------------------------------------

    #[inline]
    #[must_use]
    pub const fn position(&self) -> Position {
        self.pos
    }

    #[inline]
    #[must_use]
    pub const fn line(&self) -> usize {
        self.pos.line
    }

    #[inline]
    #[must_use]
    pub const fn col(&self) -> usize {
        self.pos.col
    }

    /// `(line, col)` counted from 1, for display.
    #[inline]
    #[must_use]
    pub const fn get_position(&self) -> (usize, usize) {
        self.pos.one_based()
    }

    /// Terminal cells taken by the text left of the cursor on its line,
    /// counted with [`char_cells`].
    #[must_use]
    pub fn display_col(&self, buf: &Buffer) -> usize {
        let pos = buf.clamp_position(self.pos);
        buf.line(pos.line).map_or(0, |line| {
            line.chars()
                .take(pos.col)
                .fold(0, |cells, c| cells + char_cells(c, cells))
        })
    }

    /// Back to the origin.
    pub const fn reset(&mut self) {
        self.pos = Position::ZERO;
    }

    // -- Horizontal movement ------------------------------------------------

    /// One character left, wrapping to the end of the previous line.
    pub fn move_left(&mut self, buf: &Buffer) {
        self.clamp(buf);
        if self.pos.col > 0 {
            self.pos.col -= 1;
        } else if self.pos.line > 0 {
            self.pos.line -= 1;
            self.pos.col = buf.line_len(self.pos.line);
        }
    }

    /// One character right, wrapping to the start of the next line.
    pub fn move_right(&mut self, buf: &Buffer) {
        self.clamp(buf);
        if self.pos.col < buf.line_len(self.pos.line) {
            self.pos.col += 1;
        } else if self.pos.line + 1 < buf.line_count() {
            self.pos.line += 1;
            self.pos.col = 0;
        }
    }

    pub fn move_to_line_start(&mut self, buf: &Buffer) {
        self.clamp(buf);
        self.pos.col = 0;
    }

    pub fn move_to_line_end(&mut self, buf: &Buffer) {
        self.clamp(buf);
        self.pos.col = buf.line_len(self.pos.line);
    }

    // -- Vertical movement --------------------------------------------------

    /// One line up; no-op on the first line.
    pub fn move_up(&mut self, buf: &Buffer) {
        self.clamp(buf);
        if self.pos.line > 0 {
            self.goto_line(buf, self.pos.line - 1);
        }
    }

    /// One line down; no-op on the last line.
    pub fn move_down(&mut self, buf: &Buffer) {
        self.clamp(buf);
        if self.pos.line + 1 < buf.line_count() {
            self.goto_line(buf, self.pos.line + 1);
        }
    }

    /// `rows` lines up, stopping at the first line.
    pub fn page_up(&mut self, buf: &Buffer, rows: usize) {
        self.clamp(buf);
        self.goto_line(buf, self.pos.line.saturating_sub(rows.max(1)));
    }

    /// `rows` lines down, stopping at the last line.
    pub fn page_down(&mut self, buf: &Buffer, rows: usize) {
        self.clamp(buf);
        let last = buf.line_count().saturating_sub(1);
        self.goto_line(buf, (self.pos.line + rows.max(1)).min(last));
    }

    fn goto_line(&mut self, buf: &Buffer, line: usize) {
        self.pos.line = line;
        self.pos.col = self.pos.col.min(buf.line_len(line));
    }

    // -- Editing ------------------------------------------------------------

    /// Splice `text` in at the cursor and move to the end of it.
    ///
    /// Newline-free text advances the column by its char count. Text with
    /// `k` newlines splits the current line: the part before the cursor
    /// gets the first segment, the part after is appended to the last, and
    /// the cursor lands `k` lines down, right after the last segment.
    pub fn insert_text(&mut self, buf: &mut Buffer, text: &str) {
        self.clamp(buf);
        if text.is_empty() {
            return;
        }
        let text = normalize_line_endings(text);
        buf.insert(self.pos, &text);

        match text.rsplit_once('\n') {
            None => self.pos.col += text.chars().count(),
            Some((head, last)) => {
                self.pos.line += head.matches('\n').count() + 1;
                self.pos.col = last.chars().count();
            }
        }
    }

    /// Delete the character before the cursor.
    ///
    /// At column 0 the line is joined onto the previous one and the cursor
    /// lands where the previous line used to end. No-op at the origin.
    pub fn backspace(&mut self, buf: &mut Buffer) {
        self.clamp(buf);
        let before = if self.pos.col > 0 {
            Position::new(self.pos.line, self.pos.col - 1)
        } else if self.pos.line > 0 {
            let prev = self.pos.line - 1;
            Position::new(prev, buf.line_len(prev))
        } else {
            return;
        };
        buf.remove(before, self.pos);
        self.pos = before;
    }

    /// Delete the character under the cursor.
    ///
    /// At the end of a line the next line is joined onto this one. No-op at
    /// the end of the buffer.
    pub fn delete_forward(&mut self, buf: &mut Buffer) {
        self.clamp(buf);
        let after = if self.pos.col < buf.line_len(self.pos.line) {
            Position::new(self.pos.line, self.pos.col + 1)
        } else if self.pos.line + 1 < buf.line_count() {
            Position::new(self.pos.line + 1, 0)
        } else {
            return;
        };
        buf.remove(self.pos, after);
    }

    fn clamp(&mut self, buf: &Buffer) {
        self.pos = buf.clamp_position(self.pos);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
