// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Raw key decoder.
//
// Turns the terminal's raw input bytes into one logical key per call.
// Two physical input APIs exist: a termios raw-mode stdin on Unix and the
// console CRT's `_getch` on Windows. They encode special keys
// differently. Both are hidden behind `TerminalInput`, which is selected
// once at startup. The decoding rules themselves live in `Decoder` and
// read from any `ByteSource`, so tests feed them byte slices.
//
// # Unix encoding
//
//   printable byte ............... Char
//   UTF-8 lead + continuations ... Char
//   ESC [ X ...................... navigation table (A B C D H F 5 6 3 1 2)
//   ESC <nothing / other> ........ Esc (the other byte is kept for later)
//   \r \t 0x7F ................... Enter Tab Backspace
//   other byte < 0x20 ............ Ctrl(byte + 64)
//
// # Windows encoding
//
//   0xE0 | 0x00 then X ........... navigation table (H P K M G O I Q S R - +)
//   \r \t ESC 0x08 ............... Enter Tab Esc Backspace
//   other byte < 0x20 ............ Ctrl(byte + 64)
//
// A lone ESC is ambiguous: the Escape key, or the first byte of a CSI
// sequence. The decoder waits a short timeout for the next byte; if none
// arrives it is the Escape key.

use std::io;
use std::time::Duration;

use tracing::debug;

#[cfg(unix)]
use crate::terminal::{self, RawModeGuard};

// ─── Event Types ────────────────────────────────────────────────────────────

/// Keys with a name rather than a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Enter,
    Tab,
    Esc,
    Backspace,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Delete,
    Insert,
    ShiftUp,
    ShiftDown,
    /// An escape suffix we have no name for, carrying its code byte.
    Special(u8),
}

/// One logical keypress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyEvent {
    /// A printable character.
    Char(char),
    /// A named key.
    Named(NamedKey),
    /// A control chord; the payload is the uppercase letter (`Ctrl('C')`).
    Ctrl(char),
}

/// What the input layer hands the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A decoded key.
    Key(KeyEvent),
    /// The blocking read was interrupted by a signal. Not a request to exit.
    Interrupt,
}

// ─── Byte Sources ───────────────────────────────────────────────────────────

/// Somewhere raw input bytes come from.
pub trait ByteSource {
    /// Block until one byte is available.
    ///
    /// # Errors
    ///
    /// Returns `Interrupted` if a signal arrived, `UnexpectedEof` if the
    /// input is closed, or any other read error.
    fn read_byte(&mut self) -> io::Result<u8>;

    /// Wait at most `timeout` for a byte. `Ok(None)` means nothing came.
    ///
    /// # Errors
    ///
    /// Same as [`read_byte`](Self::read_byte).
    fn read_byte_timeout(&mut self, timeout: Duration) -> io::Result<Option<u8>>;
}

// ─── Decoder ────────────────────────────────────────────────────────────────

/// Which encoding the byte stream uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// VT-style sequences from a raw-mode terminal.
    Unix,
    /// Scan-code prefixes from the Windows console CRT.
    Windows,
}

/// Default wait for the byte after ESC.
pub const DEFAULT_ESCAPE_TIMEOUT: Duration = Duration::from_millis(25);

/// Stateful key decoder.
///
/// The only state is one pushed-back byte: when ESC is followed by
/// something other than `[`, that byte belongs to the next key.
#[derive(Debug, Clone)]
pub struct Decoder {
    dialect: Dialect,
    escape_timeout: Duration,
    pending: Option<u8>,
}

impl Decoder {
    #[must_use]
    pub const fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            escape_timeout: DEFAULT_ESCAPE_TIMEOUT,
            pending: None,
        }
    }

    /// Override how long to wait after ESC before calling it the Escape key.
    #[must_use]
    pub const fn with_escape_timeout(mut self, timeout: Duration) -> Self {
        self.escape_timeout = timeout;
        self
    }

    #[inline]
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Block until one complete key is read from `src`.
    ///
    /// # Errors
    ///
    /// Propagates errors from the source, including `Interrupted`.
    pub fn decode(&mut self, src: &mut impl ByteSource) -> io::Result<KeyEvent> {
        loop {
            let byte = match self.pending.take() {
                Some(b) => b,
                None => src.read_byte()?,
            };
            let key = match self.dialect {
                Dialect::Unix => self.decode_unix(byte, src)?,
                Dialect::Windows => self.decode_windows(byte, src)?,
            };
            if let Some(key) = key {
                return Ok(key);
            }
        }
    }

    fn decode_unix(&mut self, byte: u8, src: &mut impl ByteSource) -> io::Result<Option<KeyEvent>> {
        let key = match byte {
            0x1B => self.decode_csi(src)?,
            b'\r' => KeyEvent::Named(NamedKey::Enter),
            b'\t' => KeyEvent::Named(NamedKey::Tab),
            0x7F => KeyEvent::Named(NamedKey::Backspace),
            b @ 0x00..=0x1F => KeyEvent::Ctrl(ctrl_letter(b)),
            b @ 0x20..=0x7E => KeyEvent::Char(char::from(b)),
            lead => return self.decode_utf8(lead, src),
        };
        Ok(Some(key))
    }

    fn decode_windows(
        &mut self,
        byte: u8,
        src: &mut impl ByteSource,
    ) -> io::Result<Option<KeyEvent>> {
        let key = match byte {
            0xE0 | 0x00 => KeyEvent::Named(windows_scan_key(src.read_byte()?)),
            b'\r' => KeyEvent::Named(NamedKey::Enter),
            b'\t' => KeyEvent::Named(NamedKey::Tab),
            0x1B => KeyEvent::Named(NamedKey::Esc),
            0x08 | 0x7F => KeyEvent::Named(NamedKey::Backspace),
            b @ 0x01..=0x1F => KeyEvent::Ctrl(ctrl_letter(b)),
            b @ 0x20..=0x7E => KeyEvent::Char(char::from(b)),
            lead => return self.decode_utf8(lead, src),
        };
        Ok(Some(key))
    }

    /// Everything after an ESC byte on Unix.
    fn decode_csi(&mut self, src: &mut impl ByteSource) -> io::Result<KeyEvent> {
        let esc = KeyEvent::Named(NamedKey::Esc);

        let Some(next) = src.read_byte_timeout(self.escape_timeout)? else {
            return Ok(esc);
        };
        if next != b'[' {
            self.pending = Some(next);
            return Ok(esc);
        }

        let Some(code) = src.read_byte_timeout(self.escape_timeout)? else {
            self.pending = Some(b'[');
            return Ok(esc);
        };

        // Parameter bytes (`5` in `ESC [ 5 ~`, `1` in `ESC [ 1 ; 2 A`) are
        // followed by more of the same sequence. Drop it up to the final byte.
        if (0x30..=0x3F).contains(&code) {
            while let Some(b) = src.read_byte_timeout(self.escape_timeout)? {
                if (0x40..=0x7E).contains(&b) {
                    break;
                }
            }
        }

        Ok(KeyEvent::Named(csi_key(code)))
    }

    /// Read the continuation bytes of a UTF-8 character. Invalid input is
    /// skipped; `None` tells [`decode`](Self::decode) to read on.
    fn decode_utf8(&mut self, lead: u8, src: &mut impl ByteSource) -> io::Result<Option<KeyEvent>> {
        let len = utf8_char_len(lead);
        if len < 2 {
            debug!(byte = lead, "skipping invalid utf-8 lead byte");
            return Ok(None);
        }

        let mut bytes = [lead, 0, 0, 0];
        for slot in bytes.iter_mut().take(len).skip(1) {
            let b = src.read_byte()?;
            if b & 0xC0 != 0x80 {
                self.pending = Some(b);
                return Ok(None);
            }
            *slot = b;
        }

        Ok(std::str::from_utf8(&bytes[..len])
            .ok()
            .and_then(|s| s.chars().next())
            .map(KeyEvent::Char))
    }
}

// ─── Tables ─────────────────────────────────────────────────────────────────

/// The byte after `ESC [`.
const fn csi_key(code: u8) -> NamedKey {
    match code {
        b'A' => NamedKey::Up,
        b'B' => NamedKey::Down,
        b'C' => NamedKey::Right,
        b'D' => NamedKey::Left,
        b'H' => NamedKey::Home,
        b'F' => NamedKey::End,
        b'5' => NamedKey::PageUp,
        b'6' => NamedKey::PageDown,
        b'3' => NamedKey::Delete,
        b'1' => NamedKey::ShiftDown,
        b'2' => NamedKey::ShiftUp,
        other => NamedKey::Special(other),
    }
}

/// The byte after a `0xE0` / `0x00` console prefix.
const fn windows_scan_key(code: u8) -> NamedKey {
    match code {
        b'H' => NamedKey::Up,
        b'P' => NamedKey::Down,
        b'K' => NamedKey::Left,
        b'M' => NamedKey::Right,
        b'G' => NamedKey::Home,
        b'O' => NamedKey::End,
        b'I' => NamedKey::PageUp,
        b'Q' => NamedKey::PageDown,
        b'S' => NamedKey::Delete,
        b'R' => NamedKey::Insert,
        b'-' => NamedKey::ShiftDown,
        b'+' => NamedKey::ShiftUp,
        other => NamedKey::Special(other),
    }
}

/// Control byte → the letter it's typed with (`0x03` → `'C'`).
const fn ctrl_letter(byte: u8) -> char {
    (byte + 64) as char
}

/// Expected byte length of a UTF-8 character from its lead byte.
/// Returns 0 for continuation bytes and invalid leads.
const fn utf8_char_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 0,
    }
}

// ─── Backends ───────────────────────────────────────────────────────────────

/// Which input API to read keys through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputBackend {
    /// Whatever the platform we were built for provides.
    #[default]
    Auto,
    /// termios raw mode on stdin.
    Unix,
    /// The Windows console CRT.
    Windows,
}

impl InputBackend {
    /// Parse a backend name (`auto`, `unix`, `windows`), case-insensitive.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "unix" => Some(Self::Unix),
            "windows" => Some(Self::Windows),
            _ => None,
        }
    }

    /// The concrete backend `Auto` stands for on this platform.
    #[must_use]
    pub const fn resolve(self) -> Self {
        match self {
            Self::Auto if cfg!(windows) => Self::Windows,
            Self::Auto => Self::Unix,
            other => other,
        }
    }
}

/// The terminal's key input, one variant per physical API.
pub enum TerminalInput {
    #[cfg(unix)]
    UnixRaw(UnixRawInput),
    #[cfg(windows)]
    WindowsConsole(WindowsConsoleInput),
}

impl TerminalInput {
    /// Open the requested backend.
    ///
    /// # Errors
    ///
    /// Returns `Unsupported` when the backend doesn't exist on this platform.
    pub fn open(backend: InputBackend, escape_timeout: Duration) -> io::Result<Self> {
        let resolved = backend.resolve();
        debug!(?backend, ?resolved, "opening terminal input");
        match resolved {
            InputBackend::Windows => Self::open_windows(escape_timeout),
            InputBackend::Unix | InputBackend::Auto => Self::open_unix(escape_timeout),
        }
    }

    #[cfg(unix)]
    #[allow(clippy::unnecessary_wraps)]
    fn open_unix(escape_timeout: Duration) -> io::Result<Self> {
        Ok(Self::UnixRaw(UnixRawInput::new(escape_timeout)))
    }

    #[cfg(not(unix))]
    fn open_unix(_escape_timeout: Duration) -> io::Result<Self> {
        Err(unsupported("unix raw-mode input"))
    }

    #[cfg(windows)]
    #[allow(clippy::unnecessary_wraps)]
    fn open_windows(_escape_timeout: Duration) -> io::Result<Self> {
        Ok(Self::WindowsConsole(WindowsConsoleInput::new()))
    }

    #[cfg(not(windows))]
    fn open_windows(_escape_timeout: Duration) -> io::Result<Self> {
        Err(unsupported("windows console input"))
    }

    /// Block until the next key (or interrupt).
    ///
    /// # Errors
    ///
    /// Returns read errors other than interruption; `UnexpectedEof` when
    /// the input is closed.
    pub fn read_event(&mut self) -> io::Result<Event> {
        match self {
            #[cfg(unix)]
            Self::UnixRaw(input) => input.read_event(),
            #[cfg(windows)]
            Self::WindowsConsole(input) => input.read_event(),
        }
    }
}

#[allow(dead_code)]
fn unsupported(what: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("{what} is not available on this platform"),
    )
}

// ── Unix ────────────────────────────────────────────────────────────────────

/// stdin read one byte at a time through `read(2)` and `poll(2)`.
#[cfg(unix)]
#[derive(Debug, Default)]
pub struct StdinBytes;

#[cfg(unix)]
impl ByteSource for StdinBytes {
    fn read_byte(&mut self) -> io::Result<u8> {
        let mut byte = 0u8;
        let n = unsafe { libc::read(libc::STDIN_FILENO, (&raw mut byte).cast::<libc::c_void>(), 1) };
        match n {
            1 => Ok(byte),
            0 => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed")),
            _ => Err(io::Error::last_os_error()),
        }
    }

    fn read_byte_timeout(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        let mut pfd = libc::pollfd {
            fd: libc::STDIN_FILENO,
            events: libc::POLLIN,
            revents: 0,
        };
        let ms = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);
        let ready = unsafe { libc::poll(&raw mut pfd, 1, ms) };
        match ready {
            0 => Ok(None),
            n if n > 0 => self.read_byte().map(Some),
            _ => Err(io::Error::last_os_error()),
        }
    }
}

/// Raw-mode stdin input.
#[cfg(unix)]
pub struct UnixRawInput {
    decoder: Decoder,
    source: StdinBytes,
}

#[cfg(unix)]
impl UnixRawInput {
    #[must_use]
    pub const fn new(escape_timeout: Duration) -> Self {
        Self {
            decoder: Decoder::new(Dialect::Unix).with_escape_timeout(escape_timeout),
            source: StdinBytes,
        }
    }

    /// Read one key with raw mode held for exactly the duration of the read.
    ///
    /// # Errors
    ///
    /// Returns errors from the mode switch or the read.
    pub fn read_event(&mut self) -> io::Result<Event> {
        if terminal::take_interrupt() {
            return Ok(Event::Interrupt);
        }

        let _raw = RawModeGuard::acquire()?;
        match self.decoder.decode(&mut self.source) {
            Ok(key) => Ok(Event::Key(key)),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                terminal::take_interrupt();
                Ok(Event::Interrupt)
            }
            Err(e) => Err(e),
        }
    }
}

// ── Windows ─────────────────────────────────────────────────────────────────

#[cfg(windows)]
unsafe extern "C" {
    fn _getch() -> std::ffi::c_int;
}

/// Console input through the CRT's unbuffered, unechoed `_getch`.
#[cfg(windows)]
#[derive(Debug, Default)]
pub struct ConsoleBytes;

#[cfg(windows)]
impl ByteSource for ConsoleBytes {
    fn read_byte(&mut self) -> io::Result<u8> {
        let c = unsafe { _getch() };
        u8::try_from(c & 0xFF).map_err(io::Error::other)
    }

    // The console reports ESC on its own and prefixes scan codes, so the
    // Windows dialect never waits on lookahead.
    fn read_byte_timeout(&mut self, _timeout: Duration) -> io::Result<Option<u8>> {
        self.read_byte().map(Some)
    }
}

/// Windows console input.
#[cfg(windows)]
pub struct WindowsConsoleInput {
    decoder: Decoder,
    source: ConsoleBytes,
}

#[cfg(windows)]
impl WindowsConsoleInput {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            decoder: Decoder::new(Dialect::Windows),
            source: ConsoleBytes,
        }
    }

    /// Read one key.
    ///
    /// # Errors
    ///
    /// Returns read errors from the console.
    pub fn read_event(&mut self) -> io::Result<Event> {
        match self.decoder.decode(&mut self.source) {
            Ok(key) => Ok(Event::Key(key)),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(Event::Interrupt),
            Err(e) => Err(e),
        }
    }
}

#[cfg(windows)]
impl Default for WindowsConsoleInput {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
