//! Clipboard bridge: the system clipboard through helper programs.
//!
//! There is no clipboard API we can call directly from a raw terminal, so
//! the text goes through whatever helper the platform has:
//!
//! | Platform | Read                                    | Write                    |
//! |----------|-----------------------------------------|--------------------------|
//! | Windows  | `powershell.exe -NoProfile -Command Get-Clipboard` | `clip` (stdin) |
//! | Unix     | `xclip -selection clipboard -o`         | `xclip -selection clipboard -i` |
//! | Unix     | `xsel -b -o`                            | `xsel -b -i`             |
//!
//! On Unix the first helper found on `PATH` wins. Every failure (no helper,
//! spawn error, non-zero exit, non-UTF-8 output) reads as empty text or
//! makes the write a no-op. Failures are logged, never returned: a broken
//! clipboard must not interrupt editing.

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::buffer::normalize_line_endings;

/// Text exchange with a clipboard.
pub trait Clipboard {
    /// Current clipboard text, or `""` when there is none or it can't be read.
    fn get_text(&mut self) -> String;

    /// Replace the clipboard text. Silently does nothing on failure.
    fn set_text(&mut self, text: &str);
}

// ---------------------------------------------------------------------------
// Helper programs
// ---------------------------------------------------------------------------

/// One program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl HelperCommand {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(OsString::from).collect(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

/// A read/write pair of helper commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardHelper {
    pub name: &'static str,
    pub read: HelperCommand,
    pub write: HelperCommand,
    /// The read side appends a line ending of its own that isn't part of
    /// the clipboard text.
    pub trims_line_ending: bool,
}

impl ClipboardHelper {
    #[must_use]
    pub fn xclip(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        Self {
            name: "xclip",
            read: HelperCommand::new(&program, &["-selection", "clipboard", "-o"]),
            write: HelperCommand::new(&program, &["-selection", "clipboard", "-i"]),
            trims_line_ending: false,
        }
    }

    #[must_use]
    pub fn xsel(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        Self {
            name: "xsel",
            read: HelperCommand::new(&program, &["-b", "-o"]),
            write: HelperCommand::new(&program, &["-b", "-i"]),
            trims_line_ending: false,
        }
    }

    #[must_use]
    pub fn windows() -> Self {
        Self {
            name: "powershell/clip",
            read: HelperCommand::new(
                "powershell.exe",
                &["-NoProfile", "-Command", "Get-Clipboard"],
            ),
            write: HelperCommand::new("clip", &[]),
            trims_line_ending: true,
        }
    }

    /// The helper this platform should use, if one is installed.
    #[must_use]
    pub fn detect() -> Option<Self> {
        if cfg!(windows) {
            return Some(Self::windows());
        }
        if let Ok(path) = which::which("xclip") {
            return Some(Self::xclip(path));
        }
        if let Ok(path) = which::which("xsel") {
            return Some(Self::xsel(path));
        }
        None
    }
}

// ---------------------------------------------------------------------------
// SystemClipboard
// ---------------------------------------------------------------------------

/// The desktop clipboard, through a helper picked once at construction.
#[derive(Debug, Clone)]
pub struct SystemClipboard {
    helper: Option<ClipboardHelper>,
}

impl SystemClipboard {
    /// Probe for a helper program.
    #[must_use]
    pub fn detect() -> Self {
        let helper = ClipboardHelper::detect();
        match &helper {
            Some(h) => info!(helper = h.name, "clipboard helper found"),
            None => info!("no clipboard helper found; copy and paste are disabled"),
        }
        Self { helper }
    }

    /// Use a specific helper.
    #[must_use]
    pub const fn with_helper(helper: ClipboardHelper) -> Self {
        Self {
            helper: Some(helper),
        }
    }

    /// A clipboard that is always empty.
    #[must_use]
    pub const fn unavailable() -> Self {
        Self { helper: None }
    }

    #[must_use]
    pub fn helper_name(&self) -> Option<&'static str> {
        self.helper.as_ref().map(|h| h.name)
    }
}

impl Clipboard for SystemClipboard {
    fn get_text(&mut self) -> String {
        let Some(helper) = &self.helper else {
            return String::new();
        };

        let output = match helper
            .read
            .command()
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                debug!(helper = helper.name, error = %e, "clipboard read failed to start");
                return String::new();
            }
        };
        if !output.status.success() {
            debug!(helper = helper.name, status = %output.status, "clipboard read failed");
            return String::new();
        }

        match String::from_utf8(output.stdout) {
            Ok(text) => clean_clipboard_text(&text, helper.trims_line_ending),
            Err(_) => {
                debug!(helper = helper.name, "clipboard text is not UTF-8");
                String::new()
            }
        }
    }

    fn set_text(&mut self, text: &str) {
        let Some(helper) = &self.helper else {
            return;
        };

        let spawned = helper
            .write
            .command()
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                debug!(helper = helper.name, error = %e, "clipboard write failed to start");
                return;
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(text.as_bytes()) {
                debug!(helper = helper.name, error = %e, "clipboard write failed");
            }
        }

        match child.wait() {
            Ok(status) if !status.success() => {
                debug!(helper = helper.name, %status, "clipboard write failed");
            }
            Err(e) => debug!(helper = helper.name, error = %e, "clipboard write failed"),
            Ok(_) => {}
        }
    }
}

/// Normalize line endings and drop the helper's own trailing line ending.
fn clean_clipboard_text(raw: &str, trim_line_ending: bool) -> String {
    let mut text = normalize_line_endings(raw);
    if trim_line_ending && text.ends_with('\n') {
        text.pop();
    }
    text
}

// ---------------------------------------------------------------------------
// MemoryClipboard
// ---------------------------------------------------------------------------

/// An in-process clipboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryClipboard {
    text: String,
}

impl MemoryClipboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Clipboard for MemoryClipboard {
    fn get_text(&mut self) -> String {
        self.text.clone()
    }

    fn set_text(&mut self, text: &str) {
        text.clone_into(&mut self.text);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
