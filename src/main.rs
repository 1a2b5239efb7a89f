// SPDX-License-Identifier: MIT
//
// rawed: a minimal raw-terminal text editor.
//
// This is the main binary that wires the two crates together:
//
//   rawed-term   → escape sequences, raw mode, key decoding, event loop
//   rawed-editor → text buffer, cursor model, highlighting, clipboard
//
// The Editor struct implements rawed-term's App trait. Each keypress flows
// through:
//
//   stdin → decoder → on_event → cursor/buffer mutation
//   paint → highlighted window + status line → one write → terminal
//
// Layout:
//
//   ┌───────────────────────────────────┐
//   │ text (Python highlighting)        │  ← rows - 1
//   ├───────────────────────────────────┤
//   │ message      Ln 3, Col 7 | 80x24  │  ← status line (inverse)
//   └───────────────────────────────────┘

mod config;

use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use rawed_editor::buffer::Buffer;
use rawed_editor::clipboard::{Clipboard, SystemClipboard};
use rawed_editor::cursor::{Cursor, char_cells};
use rawed_editor::highlight;

use rawed_term::ansi::{self, EraseDisplay, SGR_INVERSE, SGR_RESET};
use rawed_term::event_loop::{Action, App, EventLoop};
use rawed_term::input::{Event, KeyEvent, NamedKey, TerminalInput};
use rawed_term::output::OutputBuffer;
use rawed_term::terminal::Size;

use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use unicode_width::UnicodeWidthChar;

use crate::config::Config;

// ─── Editor ─────────────────────────────────────────────────────────────────

/// The editor application state.
///
/// Owns the document and the cursor side by side; the cursor model is the
/// only thing that mutates the buffer.
struct Editor<C: Clipboard> {
    buffer: Buffer,
    cursor: Cursor,
    clipboard: C,

    /// What the Tab key inserts.
    tab_text: String,

    /// A notification for the status line. Cleared on the next keypress.
    message: Option<String>,

    /// First buffer line shown on screen.
    scroll: usize,

    /// Text rows in the last painted frame; the PageUp/PageDown distance.
    text_rows: usize,
}

impl<C: Clipboard> Editor<C> {
    fn new(clipboard: C, tab_text: String) -> Self {
        Self {
            buffer: Buffer::new(),
            cursor: Cursor::new(),
            clipboard,
            tab_text,
            message: None,
            scroll: 0,
            text_rows: usize::from(Size::FALLBACK.rows - 1),
        }
    }

    /// Load `path` into the editor.
    ///
    /// A missing file is not an error: the buffer stays empty but keeps the
    /// path, so the first save creates it. Any other failure leaves an
    /// unnamed empty buffer. Both show a notification.
    fn open(&mut self, path: &Path) {
        self.cursor.reset();
        self.scroll = 0;
        match Buffer::from_file(path) {
            Ok(buffer) => self.buffer = buffer,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not load file");
                self.buffer = if e.is_not_found() {
                    Buffer::with_path(path)
                } else {
                    Buffer::new()
                };
                self.message = Some(e.to_string());
            }
        }
    }

    // ── Key handling ────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> Action {
        self.message = None;

        match key {
            KeyEvent::Char(c) => {
                let mut utf8 = [0u8; 4];
                self.insert(c.encode_utf8(&mut utf8));
            }
            KeyEvent::Named(named) => return self.handle_named(named),
            KeyEvent::Ctrl('C') => self.copy(),
            KeyEvent::Ctrl('V') => self.paste(),
            KeyEvent::Ctrl('S') => self.save(),
            KeyEvent::Ctrl(other) => debug!(key = %other, "unbound control key"),
        }
        Action::Continue
    }

    fn handle_named(&mut self, key: NamedKey) -> Action {
        let buf = &self.buffer;
        match key {
            NamedKey::Esc => return Action::Quit,
            NamedKey::Enter => self.insert("\n"),
            NamedKey::Tab => {
                let tab = self.tab_text.clone();
                self.insert(&tab);
            }
            NamedKey::Backspace => self.cursor.backspace(&mut self.buffer),
            NamedKey::Delete => self.cursor.delete_forward(&mut self.buffer),
            NamedKey::Left => self.cursor.move_left(buf),
            NamedKey::Right => self.cursor.move_right(buf),
            NamedKey::Up => self.cursor.move_up(buf),
            NamedKey::Down => self.cursor.move_down(buf),
            NamedKey::Home => self.cursor.move_to_line_start(buf),
            NamedKey::End => self.cursor.move_to_line_end(buf),
            NamedKey::PageUp => self.cursor.page_up(buf, self.text_rows),
            NamedKey::PageDown => self.cursor.page_down(buf, self.text_rows),
            NamedKey::Insert | NamedKey::ShiftUp | NamedKey::ShiftDown | NamedKey::Special(_) => {
                debug!(?key, "unbound key");
            }
        }
        Action::Continue
    }

    fn insert(&mut self, text: &str) {
        self.cursor.insert_text(&mut self.buffer, text);
    }

    // ── Commands ────────────────────────────────────────────────────────

    /// Ctrl+C: the whole buffer goes to the clipboard.
    fn copy(&mut self) {
        let text = self.buffer.contents();
        debug!(bytes = text.len(), "copy buffer");
        self.clipboard.set_text(&text);
    }

    /// Ctrl+V: clipboard text goes in at the cursor.
    fn paste(&mut self) {
        let text = self.clipboard.get_text();
        debug!(bytes = text.len(), "paste");
        if !text.is_empty() {
            self.insert(&text);
        }
    }

    /// Ctrl+S: write the buffer back. Exactly one notification either way.
    fn save(&mut self) {
        let message = match self.buffer.save() {
            Ok(()) => {
                let name = self.buffer.path().map_or_else(String::new, |p| p.display().to_string());
                info!(path = %name, "saved");
                format!("File '{name}' saved successfully!")
            }
            Err(e) => {
                error!(error = %e, "save failed");
                e.to_string()
            }
        };
        self.message = Some(message);
    }

    // ── Rendering ───────────────────────────────────────────────────────

    /// Adjust `scroll` so the cursor line is inside `rows` visible lines.
    fn scroll_to_cursor(&mut self, rows: usize) {
        let line = self.cursor.line();
        if line < self.scroll {
            self.scroll = line;
        } else if rows > 0 && line >= self.scroll + rows {
            self.scroll = line + 1 - rows;
        }
        self.scroll = self.scroll.min(self.buffer.line_count().saturating_sub(1));
    }

    /// The status line text, exactly `cols` cells wide: the notification on
    /// the left, the cursor position and terminal size on the right.
    fn status_line(&self, size: Size) -> String {
        let cols = usize::from(size.cols);
        let (line, col) = self.cursor.get_position();
        let right = format!("Ln {line}, Col {col} | {}x{}", size.cols, size.rows);
        let right = truncate_to_width(&right, cols);
        let right_width = str_width(right);

        let room = cols.saturating_sub(right_width + 1);
        let left = truncate_to_width(self.message.as_deref().unwrap_or(""), room);
        let gap = cols.saturating_sub(str_width(left) + right_width);

        format!("{left}{:gap$}{right}", "")
    }
}

// ─── App implementation ─────────────────────────────────────────────────────

impl<C: Clipboard> App for Editor<C> {
    fn on_event(&mut self, event: &Event) -> Action {
        match event {
            Event::Key(key) => self.handle_key(*key),
            Event::Interrupt => {
                debug!("interrupt ignored");
                Action::Continue
            }
        }
    }

    fn paint(&mut self, out: &mut OutputBuffer, size: Size) {
        let rows = usize::from(size.rows.max(1));
        let text_rows = rows - 1;
        self.text_rows = text_rows.max(1);
        self.scroll_to_cursor(text_rows);

        out.push_str(&ansi::cursor_position(1, 1));
        out.push_str(&ansi::erase_in_display(EraseDisplay::ToEnd));

        // ── Text window ─────────────────────────────────────────────
        // One screen row per buffer line, cut at the terminal width so the
        // terminal never wraps a row into the next one.
        if text_rows > 0 {
            let text = self.buffer.contents();
            let spans = highlight::spans(&text);
            let cols = usize::from(size.cols);
            let first = self.scroll;
            let last = (first + text_rows).min(self.buffer.line_count());

            for line in first..last {
                if line > first {
                    out.push_text("\n");
                }
                let start = self.buffer.line_to_byte(line);
                let end = self.buffer.line_to_byte(line + 1);
                let row = clip_row(text.get(start..end).unwrap_or(""), cols);
                let window = start..start + row.len();
                out.push_str(&highlight::apply(
                    &visible_controls(row),
                    &highlight::clip_spans(&spans, window),
                ));
            }
        }

        // ── Status line ─────────────────────────────────────────────
        out.push_str(&ansi::cursor_position(size.rows.max(1), 1));
        out.push_str(&ansi::select_graphic_rendition(SGR_INVERSE));
        out.push_str(&self.status_line(size));
        out.push_str(&ansi::select_graphic_rendition(SGR_RESET));

        // ── Cursor ──────────────────────────────────────────────────
        let screen_line = (self.cursor.line().saturating_sub(self.scroll) + 1).min(text_rows.max(1));
        let screen_col = (self.cursor.display_col(&self.buffer) + 1).min(usize::from(size.cols.max(1)));
        out.push_str(&ansi::cursor_position(to_u16(screen_line), to_u16(screen_col)));
    }
}

// ─── Text width helpers ─────────────────────────────────────────────────────

/// The part of `line` before its `\n` that fits in `cols` cells.
fn clip_row(line: &str, cols: usize) -> &str {
    let mut cells = 0;
    for (i, c) in line.char_indices() {
        cells += char_cells(c, cells);
        if c == '\n' || cells > cols {
            return &line[..i];
        }
    }
    line
}

/// Control characters other than tab would move the terminal cursor, so
/// they are drawn as `?`. Byte offsets stay the same.
fn visible_controls(row: &str) -> String {
    row.chars()
        .map(|c| if c.is_ascii_control() && c != '\t' { '?' } else { c })
        .collect()
}

fn to_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

fn str_width(s: &str) -> usize {
    s.chars().map(|c| c.width().unwrap_or(0)).sum()
}

/// The longest prefix of `s` that fits in `width` cells.
fn truncate_to_width(s: &str, width: usize) -> &str {
    let mut used = 0;
    for (i, c) in s.char_indices() {
        used += c.width().unwrap_or(0);
        if used > width {
            return &s[..i];
        }
    }
    s
}

// ─── Logging ────────────────────────────────────────────────────────────────

/// Send `tracing` output to `path`, if given. The terminal is in raw mode
/// while the editor runs, so a file is the only place logs can go.
fn init_logging(path: Option<&Path>) -> Option<WorkerGuard> {
    let path = path?;
    let dir = path.parent().filter(|d| !d.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let file_name = path.file_name()?.to_string_lossy().into_owned();

    let appender = match RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
    {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("rawed: cannot open log file {}: {e}", path.display());
            return None;
        }
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;
    Some(guard)
}

// ─── Entry point ────────────────────────────────────────────────────────────

fn run(config: &Config, path: Option<PathBuf>) -> io::Result<()> {
    let mut editor = Editor::new(SystemClipboard::detect(), config.tab_text());
    if let Some(path) = path {
        editor.open(&path);
    }

    let input = TerminalInput::open(config.input, config.escape_timeout)?;
    EventLoop::new(input).run(&mut editor)
}

fn main() {
    let config = Config::from_env();
    let log_guard = init_logging(config.log_file.as_deref());
    for warning in &config.warnings {
        warn!("{warning}");
    }

    let path = env::args_os().nth(1).map(PathBuf::from);
    info!(path = ?path, input = ?config.input, "starting");

    let result = run(&config, path);
    if let Err(e) = &result {
        error!(error = %e, "terminated");
    }
    drop(log_guard);

    if let Err(e) = result {
        eprintln!("rawed: {e}");
        process::exit(1);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
