// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure functions that return the exact control sequence for one terminal
// command. No state, no I/O, no decisions about when to emit. The frame
// builder and the highlighter decide that. This module only knows the
// byte-level encoding.
//
// Every CSI command here takes 1-based parameters exactly as the terminal
// expects them. Callers holding 0-based coordinates convert before calling.

/// Control Sequence Introducer: `ESC [`.
pub const CSI: &str = "\x1b[";

// ─── Cursor Movement ────────────────────────────────────────────────────────

/// Move the cursor up `n` lines (CUU).
#[must_use]
pub fn cursor_up(n: u16) -> String {
    format!("{CSI}{n}A")
}

/// Move the cursor down `n` lines (CUD).
#[must_use]
pub fn cursor_down(n: u16) -> String {
    format!("{CSI}{n}B")
}

/// Move the cursor forward `n` columns (CUF).
#[must_use]
pub fn cursor_forward(n: u16) -> String {
    format!("{CSI}{n}C")
}

/// Move the cursor back `n` columns (CUB).
#[must_use]
pub fn cursor_back(n: u16) -> String {
    format!("{CSI}{n}D")
}

/// Move to the start of the line `n` lines down (CNL).
#[must_use]
pub fn cursor_next_line(n: u16) -> String {
    format!("{CSI}{n}E")
}

/// Move to the start of the line `n` lines up (CPL).
#[must_use]
pub fn cursor_previous_line(n: u16) -> String {
    format!("{CSI}{n}F")
}

/// Move the cursor to column `n` of the current line (CHA).
#[must_use]
pub fn cursor_horizontal_absolute(n: u16) -> String {
    format!("{CSI}{n}G")
}

/// Move the cursor to `line`, `col` (CUP). Both 1-based.
#[must_use]
pub fn cursor_position(line: u16, col: u16) -> String {
    format!("{CSI}{line};{col}H")
}

/// Save the cursor position (SCP).
#[must_use]
pub fn save_cursor_position() -> String {
    format!("{CSI}s")
}

/// Restore the cursor position saved by [`save_cursor_position`] (RCP).
#[must_use]
pub fn restore_cursor_position() -> String {
    format!("{CSI}u")
}

/// Ask the terminal to report the cursor position (DSR 6).
///
/// The reply arrives on the input side as `ESC [ line ; col R`.
#[must_use]
pub fn device_status_report() -> String {
    format!("{CSI}6n")
}

// ─── Erasing ────────────────────────────────────────────────────────────────

/// Which part of the screen [`erase_in_display`] clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseDisplay {
    /// From the cursor to the end of the screen (ED 0).
    ToEnd,
    /// From the cursor to the start of the screen (ED 1).
    ToStart,
    /// The whole screen (ED 2).
    All,
    /// The whole screen plus the scrollback buffer (ED 3).
    Scrollback,
}

impl EraseDisplay {
    /// The numeric ED parameter.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::ToEnd => 0,
            Self::ToStart => 1,
            Self::All => 2,
            Self::Scrollback => 3,
        }
    }
}

/// Which part of the current line [`erase_in_line`] clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseLine {
    /// From the cursor to the end of the line (EL 0).
    ToEnd,
    /// From the cursor to the start of the line (EL 1).
    ToStart,
    /// The whole line; the cursor does not move (EL 2).
    All,
}

impl EraseLine {
    /// The numeric EL parameter.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::ToEnd => 0,
            Self::ToStart => 1,
            Self::All => 2,
        }
    }
}

/// Erase part of the screen (ED).
#[must_use]
pub fn erase_in_display(mode: EraseDisplay) -> String {
    format!("{CSI}{}J", mode.code())
}

/// Erase part of the current line (EL).
#[must_use]
pub fn erase_in_line(mode: EraseLine) -> String {
    format!("{CSI}{}K", mode.code())
}

// ─── Graphic Rendition ──────────────────────────────────────────────────────

/// Reset all attributes.
pub const SGR_RESET: u8 = 0;
/// Magenta foreground.
pub const SGR_FG_MAGENTA: u8 = 35;
/// Cyan foreground.
pub const SGR_FG_CYAN: u8 = 36;
/// Default foreground.
pub const SGR_FG_DEFAULT: u8 = 39;
/// Inverse video.
pub const SGR_INVERSE: u8 = 7;

/// Select graphic rendition `code` (SGR).
#[must_use]
pub fn select_graphic_rendition(code: u8) -> String {
    format!("{CSI}{code}m")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
