//! Text positions.
//!
//! Coordinates are **0-indexed**: line 0 is the first line, column 0 the
//! first character. Columns count Unicode scalar values, the same unit
//! `ropey` indexes chars by. The status line shows them 1-indexed through
//! [`Position::one_based`]; nothing below the display layer does.

use std::fmt;

/// A cursor or edit location: (line, column), both 0-indexed.
///
/// For the line `"café"`, column 3 is `'é'` and column 4 is the slot after
/// it, where typed text is appended.
///
/// Positions order by line, then column.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    /// Start of the buffer.
    pub const ZERO: Self = Self { line: 0, col: 0 };

    #[inline]
    #[must_use]
    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }

    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.line == 0 && self.col == 0
    }

    /// `(line, col)` counted from 1, as shown to the user.
    #[inline]
    #[must_use]
    pub const fn one_based(self) -> (usize, usize) {
        (self.line + 1, self.col + 1)
    }
}

impl Ord for Position {
    #[inline]
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.line.cmp(&other.line).then(self.col.cmp(&other.col))
    }
}

impl PartialOrd for Position {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pos({}:{})", self.line, self.col)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (line, col) = self.one_based();
        write!(f, "Ln {line}, Col {col}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
