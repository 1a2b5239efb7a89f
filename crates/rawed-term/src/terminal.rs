// SPDX-License-Identifier: MIT
//
// Terminal control: the raw-mode guard, size queries and SIGINT.
//
// Safety: This module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr), ioctl (TIOCGWINSZ), isatty, sigaction and raw fd writes.
// These are the standard POSIX interfaces for terminal control; there is
// no safe alternative. Each unsafe block is minimal.
#![allow(unsafe_code)]
//
// Raw mode is the one shared external resource the editor holds. It is
// modelled as `RawModeGuard`: acquiring it captures the current mode and
// switches to raw, dropping it restores the captured mode. Every exit path
// (normal return, `?`, panic unwinding) runs `Drop`, so restoration never
// has to be repeated at call sites.
//
// The mode switch itself sits behind the `ModeSwitch` trait so the guard's
// acquire/release discipline can be exercised in tests with a fake device.
//
// The panic hook is a backstop for panics that abort instead of unwinding
// through the guard: it writes a reset sequence straight to fd 1 (bypassing
// the stdout lock, which the panicking frame may hold) and restores termios
// from a global backup before the original hook prints its message.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, Once};

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    /// Number of columns (width in character cells).
    pub cols: u16,
    /// Number of rows (height in character cells).
    pub rows: u16,
}

impl Size {
    /// Used when the size can't be queried (pipes, tests, Windows).
    pub const FALLBACK: Self = Self { cols: 80, rows: 24 };
}

// ─── Terminal Queries ───────────────────────────────────────────────────────

/// Query the current terminal size via `ioctl(TIOCGWINSZ)`.
///
/// Returns `None` if stdout is not a terminal or the query fails.
#[cfg(unix)]
#[must_use]
pub fn get_size() -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };

    if result == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
        Some(Size {
            cols: ws.ws_col,
            rows: ws.ws_row,
        })
    } else {
        None
    }
}

#[cfg(not(unix))]
#[must_use]
pub fn get_size() -> Option<Size> {
    None
}

/// Current size, or [`Size::FALLBACK`] when it can't be determined.
#[must_use]
pub fn size_or_fallback() -> Size {
    get_size().unwrap_or(Size::FALLBACK)
}

/// Check whether stdin is connected to a terminal (TTY).
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

// ─── Interrupt Signal ───────────────────────────────────────────────────────

/// Set by the SIGINT handler, consumed by the input backend.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Install a SIGINT handler that records the signal instead of terminating.
///
/// Installed without `SA_RESTART`, so a blocking `read()` in progress
/// returns `EINTR` and the input layer can report the interrupt as an
/// ordinary event. Raw mode clears `ISIG`, so Ctrl+C typed at the keyboard
/// arrives as byte `0x03`; this handler covers signals sent from outside.
#[cfg(unix)]
pub fn install_interrupt_handler() {
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = sigint_handler as *const () as usize;
        sa.sa_flags = 0;
        libc::sigemptyset(&raw mut sa.sa_mask);
        libc::sigaction(libc::SIGINT, &raw const sa, std::ptr::null_mut());
    }
}

#[cfg(unix)]
extern "C" fn sigint_handler(_sig: libc::c_int) {
    INTERRUPTED.store(true, Ordering::Relaxed);
}

#[cfg(not(unix))]
pub fn install_interrupt_handler() {
    // The console CRT reports Ctrl+C through `_getch` as a control byte.
}

/// Consume the pending-interrupt flag. Returns `true` once per signal.
pub fn take_interrupt() -> bool {
    INTERRUPTED.swap(false, Ordering::Relaxed)
}

// ─── Panic-Safe Terminal Restore ────────────────────────────────────────────

/// Global backup of the original termios for panic recovery.
///
/// The guard owns its own copy, but the panic hook can't reach it. This
/// backup lets the hook restore cooked mode without the guard.
#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

/// Restore termios from the global backup. Best-effort, ignores errors.
#[cfg(unix)]
fn restore_termios_from_backup() {
    if let Ok(guard) = TERMIOS_BACKUP.lock() {
        if let Some(ref original) = *guard {
            unsafe {
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, original);
            }
        }
    }
}

/// Reset SGR attributes and show the cursor.
const EMERGENCY_RESTORE: &[u8] = b"\x1b[0m\x1b[?25h";

/// Installs the panic hook at most once per process.
static PANIC_HOOK_INSTALLED: Once = Once::new();

fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();

            #[cfg(unix)]
            restore_termios_from_backup();

            original(info);
        }));
    });
}

/// Write the restore sequence directly to stdout's file descriptor.
fn emergency_restore() {
    #[cfg(unix)]
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }

    #[cfg(not(unix))]
    {
        use std::io::Write;
        let _ = io::stdout().write_all(EMERGENCY_RESTORE);
        let _ = io::stdout().flush();
    }
}

// ─── Mode Switching ─────────────────────────────────────────────────────────

/// A device whose input mode can be captured, switched to raw, and restored.
pub trait ModeSwitch {
    /// Whatever is needed to put the device back the way it was.
    type Saved;

    /// Capture the current mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the mode can't be read.
    fn capture(&mut self) -> io::Result<Self::Saved>;

    /// Switch to raw, unechoed, non-canonical input.
    ///
    /// # Errors
    ///
    /// Returns an error if the mode can't be changed.
    fn enter_raw(&mut self, saved: &Self::Saved) -> io::Result<()>;

    /// Put back the captured mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the mode can't be changed.
    fn restore(&mut self, saved: &Self::Saved) -> io::Result<()>;
}

/// Raw mode on stdin through termios.
///
/// When stdin is not a TTY every operation is a no-op, so the editor can
/// be driven from a pipe.
#[cfg(unix)]
#[derive(Debug, Default)]
pub struct StdinTermios {
    /// Whether this switch wrote the panic-hook backup (the outermost guard).
    owns_backup: bool,
}

#[cfg(unix)]
impl StdinTermios {
    #[must_use]
    pub const fn new() -> Self {
        Self { owns_backup: false }
    }
}

#[cfg(unix)]
impl ModeSwitch for StdinTermios {
    type Saved = Option<libc::termios>;

    fn capture(&mut self) -> io::Result<Self::Saved> {
        if !is_tty() {
            return Ok(None);
        }
        unsafe {
            let mut termios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(libc::STDIN_FILENO, &raw mut termios) != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(Some(termios))
        }
    }

    fn enter_raw(&mut self, saved: &Self::Saved) -> io::Result<()> {
        let Some(original) = saved else {
            return Ok(());
        };

        if let Ok(mut backup) = TERMIOS_BACKUP.lock() {
            if backup.is_none() {
                *backup = Some(*original);
                self.owns_backup = true;
            }
        }

        let mut termios = *original;
        // cfmakeraw equivalent: disable all line processing.
        termios.c_iflag &= !(libc::IGNBRK
            | libc::BRKINT
            | libc::PARMRK
            | libc::ISTRIP
            | libc::INLCR
            | libc::IGNCR
            | libc::ICRNL
            | libc::IXON);
        termios.c_oflag &= !libc::OPOST;
        termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
        termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
        termios.c_cflag |= libc::CS8;

        // VMIN=1, VTIME=0: read() blocks until at least 1 byte available.
        termios.c_cc[libc::VMIN] = 1;
        termios.c_cc[libc::VTIME] = 0;

        unsafe {
            if libc::tcsetattr(libc::STDIN_FILENO, libc::TCSADRAIN, &raw const termios) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }

    fn restore(&mut self, saved: &Self::Saved) -> io::Result<()> {
        let Some(original) = saved else {
            return Ok(());
        };
        unsafe {
            if libc::tcsetattr(libc::STDIN_FILENO, libc::TCSADRAIN, original) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        if self.owns_backup {
            if let Ok(mut backup) = TERMIOS_BACKUP.lock() {
                *backup = None;
            }
            self.owns_backup = false;
        }
        Ok(())
    }
}

/// Mode switch for consoles read through the CRT, which never echo or
/// line-buffer `_getch` input. Nothing to switch.
#[derive(Debug, Default)]
pub struct ConsoleNoop;

impl ModeSwitch for ConsoleNoop {
    type Saved = ();

    fn capture(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn enter_raw(&mut self, _saved: &()) -> io::Result<()> {
        Ok(())
    }

    fn restore(&mut self, _saved: &()) -> io::Result<()> {
        Ok(())
    }
}

/// The mode switch for the platform we were built for.
#[cfg(unix)]
pub type PlatformMode = StdinTermios;
#[cfg(not(unix))]
pub type PlatformMode = ConsoleNoop;

// ─── RawModeGuard ───────────────────────────────────────────────────────────

/// Raw mode held for the lifetime of the value.
///
/// # Example
///
/// ```no_run
/// use rawed_term::terminal::RawModeGuard;
///
/// let guard = RawModeGuard::acquire()?;
/// // ... read keys, draw frames ...
/// drop(guard); // previous mode restored (also on `?` and panics)
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct RawModeGuard<M: ModeSwitch = PlatformMode> {
    switch: M,
    /// `Some` while raw mode is held. Taken on release.
    saved: Option<M::Saved>,
}

impl RawModeGuard<PlatformMode> {
    /// Switch the process's terminal to raw mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal mode can't be read or changed.
    pub fn acquire() -> io::Result<Self> {
        install_panic_hook();
        Self::acquire_with(PlatformMode::default())
    }
}

impl<M: ModeSwitch> RawModeGuard<M> {
    /// Capture `switch`'s current mode and enter raw mode on it.
    ///
    /// If entering raw mode fails half-way, the captured mode is restored
    /// before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if capturing or switching fails.
    pub fn acquire_with(mut switch: M) -> io::Result<Self> {
        let saved = switch.capture()?;
        let mut guard = Self {
            switch,
            saved: Some(saved),
        };
        if let Some(saved) = guard.saved.as_ref() {
            guard.switch.enter_raw(saved)?;
        }
        Ok(guard)
    }

    /// Whether raw mode is still held.
    #[inline]
    #[must_use]
    pub const fn is_held(&self) -> bool {
        self.saved.is_some()
    }

    /// Restore the captured mode now and report any failure.
    ///
    /// `Drop` does the same silently; call this when the error matters.
    ///
    /// # Errors
    ///
    /// Returns an error if the mode can't be restored.
    pub fn release(mut self) -> io::Result<()> {
        self.restore_now()
    }

    fn restore_now(&mut self) -> io::Result<()> {
        match self.saved.take() {
            Some(saved) => self.switch.restore(&saved),
            None => Ok(()),
        }
    }
}

impl<M: ModeSwitch> Drop for RawModeGuard<M> {
    fn drop(&mut self) {
        let _ = self.restore_now();
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Fake device that logs every call into a shared journal.
    #[derive(Clone, Default)]
    struct FakeMode {
        log: Rc<RefCell<Vec<&'static str>>>,
        fail_enter: bool,
    }

    impl ModeSwitch for FakeMode {
        type Saved = &'static str;

        fn capture(&mut self) -> io::Result<&'static str> {
            self.log.borrow_mut().push("capture");
            Ok("cooked")
        }

        fn enter_raw(&mut self, _saved: &&'static str) -> io::Result<()> {
            self.log.borrow_mut().push("raw");
            if self.fail_enter {
                return Err(io::Error::other("tcsetattr failed"));
            }
            Ok(())
        }

        fn restore(&mut self, saved: &&'static str) -> io::Result<()> {
            assert_eq!(*saved, "cooked");
            self.log.borrow_mut().push("restore");
            Ok(())
        }
    }

    fn journal(mode: &FakeMode) -> Vec<&'static str> {
        mode.log.borrow().clone()
    }

    // ── Guard lifecycle ─────────────────────────────────────────────

    #[test]
    fn drop_restores() {
        let mode = FakeMode::default();
        {
            let guard = RawModeGuard::acquire_with(mode.clone()).unwrap();
            assert!(guard.is_held());
        }
        assert_eq!(journal(&mode), ["capture", "raw", "restore"]);
    }

    #[test]
    fn release_restores_once() {
        let mode = FakeMode::default();
        let guard = RawModeGuard::acquire_with(mode.clone()).unwrap();
        guard.release().unwrap();
        assert_eq!(journal(&mode), ["capture", "raw", "restore"]);
    }

    #[test]
    fn early_return_restores() {
        fn work(mode: FakeMode) -> io::Result<()> {
            let _guard = RawModeGuard::acquire_with(mode)?;
            Err(io::Error::other("read failed"))
        }
        let mode = FakeMode::default();
        assert!(work(mode.clone()).is_err());
        assert_eq!(journal(&mode), ["capture", "raw", "restore"]);
    }

    #[test]
    fn panic_restores() {
        let mode = FakeMode::default();
        let inner = mode.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = RawModeGuard::acquire_with(inner).unwrap();
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(journal(&mode), ["capture", "raw", "restore"]);
    }

    #[test]
    fn failed_enter_still_restores() {
        let mode = FakeMode {
            fail_enter: true,
            ..FakeMode::default()
        };
        assert!(RawModeGuard::acquire_with(mode.clone()).is_err());
        assert_eq!(journal(&mode), ["capture", "raw", "restore"]);
    }

    #[test]
    fn nested_guards_restore_in_reverse() {
        let mode = FakeMode::default();
        {
            let _outer = RawModeGuard::acquire_with(mode.clone()).unwrap();
            {
                let _inner = RawModeGuard::acquire_with(mode.clone()).unwrap();
            }
            assert_eq!(
                journal(&mode),
                ["capture", "raw", "capture", "raw", "restore"]
            );
        }
        assert_eq!(journal(&mode).len(), 6);
    }

    #[test]
    fn console_noop_guard() {
        let guard = RawModeGuard::acquire_with(ConsoleNoop).unwrap();
        assert!(guard.is_held());
        guard.release().unwrap();
    }

    // ── Queries ─────────────────────────────────────────────────────

    #[test]
    fn get_size_does_not_panic() {
        let _ = get_size();
    }

    #[test]
    fn size_or_fallback_is_positive() {
        let s = size_or_fallback();
        assert!(s.cols > 0);
        assert!(s.rows > 0);
    }

    #[test]
    fn is_tty_does_not_panic() {
        let _ = is_tty();
    }

    // ── Interrupt flag ──────────────────────────────────────────────

    #[test]
    fn interrupt_flag_is_consumed() {
        INTERRUPTED.store(true, Ordering::Relaxed);
        assert!(take_interrupt());
        assert!(!take_interrupt());
    }

    #[test]
    fn emergency_restore_resets_attributes() {
        let s = std::str::from_utf8(EMERGENCY_RESTORE).unwrap();
        assert!(s.contains("\x1b[0m"));
        assert!(s.contains("\x1b[?25h"));
    }
}
