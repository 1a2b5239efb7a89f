// SPDX-License-Identifier: MIT
//
// Event loop: the synchronous heartbeat of the editor.
//
// One key in, one full frame out. The loop blocks on the input backend
// (the only suspension point), hands the event to the application, and
// on anything but Quit asks the application to paint a complete frame
// into an `OutputBuffer`, which is written with one write and one flush.
//
// There is no tick, no reader thread and no diffing. The terminal size is
// re-queried before every paint, so a resize shows up on the next key.
//
// Raw mode is held for the whole session by a `RawModeGuard` acquired
// before the first paint. The input backend takes its own nested guard
// around each read. Both restore on drop, whatever way the loop ends.

use std::io::{self, Write};

use tracing::{debug, info};

use crate::ansi::{self, EraseDisplay};
use crate::input::{Event, TerminalInput};
use crate::output::OutputBuffer;
use crate::terminal::{self, RawModeGuard, Size};

// ─── App Trait ───────────────────────────────────────────────────────────────

/// What the application tells the event loop to do after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Repaint and read the next event.
    Continue,
    /// Clear the screen and leave the loop.
    Quit,
}

/// Application interface for the event loop.
///
/// The loop calls [`paint`](App::paint) once before the first read, then
/// [`on_event`](App::on_event) followed by `paint` for every event.
pub trait App {
    /// Handle one input event. Return [`Action::Quit`] to exit.
    fn on_event(&mut self, event: &Event) -> Action;

    /// Paint the complete frame for a terminal of `size`.
    ///
    /// The buffer is empty on entry. Everything visible must be written,
    /// including the final cursor placement.
    fn paint(&mut self, out: &mut OutputBuffer, size: Size);
}

// ─── Event Sources ───────────────────────────────────────────────────────────

/// Where the loop gets events from.
pub trait EventSource {
    /// Block until the next event.
    ///
    /// # Errors
    ///
    /// Returns read errors; `UnexpectedEof` when input is closed.
    fn next_event(&mut self) -> io::Result<Event>;
}

impl EventSource for TerminalInput {
    fn next_event(&mut self) -> io::Result<Event> {
        self.read_event()
    }
}

// ─── EventLoop ───────────────────────────────────────────────────────────────

/// The terminal event loop.
///
/// # Example
///
/// ```no_run
/// use rawed_term::event_loop::{Action, App, EventLoop};
/// use rawed_term::input::{Event, InputBackend, KeyEvent, NamedKey, TerminalInput};
/// use rawed_term::output::OutputBuffer;
/// use rawed_term::terminal::Size;
/// use std::time::Duration;
///
/// struct Quitter;
///
/// impl App for Quitter {
///     fn on_event(&mut self, event: &Event) -> Action {
///         match event {
///             Event::Key(KeyEvent::Named(NamedKey::Esc)) => Action::Quit,
///             _ => Action::Continue,
///         }
///     }
///
///     fn paint(&mut self, out: &mut OutputBuffer, _size: Size) {
///         out.push_str("press ESC");
///     }
/// }
///
/// let input = TerminalInput::open(InputBackend::Auto, Duration::from_millis(25))?;
/// EventLoop::new(input).run(&mut Quitter)?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct EventLoop<S: EventSource = TerminalInput> {
    input: S,
    frame: OutputBuffer,
}

impl<S: EventSource> EventLoop<S> {
    #[must_use]
    pub fn new(input: S) -> Self {
        Self {
            input,
            frame: OutputBuffer::new(),
        }
    }

    /// Run on the real terminal until the application quits.
    ///
    /// Closed input ends the loop like Quit does.
    ///
    /// # Errors
    ///
    /// Returns terminal I/O errors. Raw mode is restored before returning.
    pub fn run(&mut self, app: &mut impl App) -> io::Result<()> {
        terminal::install_interrupt_handler();
        let guard = RawModeGuard::acquire()?;
        info!("event loop started");

        let mut stdout = io::stdout();
        let result = self.drive(app, &mut stdout, terminal::size_or_fallback);

        guard.release()?;
        info!("event loop stopped");
        result
    }

    /// The loop itself, against any writer and size query.
    ///
    /// # Errors
    ///
    /// Returns the first read or write error other than closed input.
    pub fn drive(
        &mut self,
        app: &mut impl App,
        out: &mut impl Write,
        size: impl Fn() -> Size,
    ) -> io::Result<()> {
        self.render(app, out, size())?;

        loop {
            let event = match self.input.next_event() {
                Ok(event) => event,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    debug!("input closed");
                    return clear_screen(out);
                }
                Err(e) => return Err(e),
            };

            if app.on_event(&event) == Action::Quit {
                return clear_screen(out);
            }

            self.render(app, out, size())?;
        }
    }

    fn render(&mut self, app: &mut impl App, out: &mut impl Write, size: Size) -> io::Result<()> {
        self.frame.clear();
        app.paint(&mut self.frame, size);
        self.frame.flush_to(out)
    }
}

/// Home the cursor and wipe the whole screen.
fn clear_screen(out: &mut impl Write) -> io::Result<()> {
    let text = ansi::cursor_position(1, 1) + &ansi::erase_in_display(EraseDisplay::All);
    crate::output::flush(out, &text)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{KeyEvent, NamedKey};
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;

    /// Replays a fixed list of events, then reports closed input.
    struct Script(VecDeque<io::Result<Event>>);

    impl Script {
        fn keys(events: impl IntoIterator<Item = Event>) -> Self {
            Self(events.into_iter().map(Ok).collect())
        }
    }

    impl EventSource for Script {
        fn next_event(&mut self) -> io::Result<Event> {
            self.0
                .pop_front()
                .unwrap_or_else(|| Err(io::Error::from(io::ErrorKind::UnexpectedEof)))
        }
    }

    /// Counts keys and quits on Esc.
    #[derive(Default)]
    struct Counter {
        keys: usize,
        interrupts: usize,
        sizes: Vec<Size>,
    }

    impl App for Counter {
        fn on_event(&mut self, event: &Event) -> Action {
            match event {
                Event::Key(KeyEvent::Named(NamedKey::Esc)) => Action::Quit,
                Event::Key(_) => {
                    self.keys += 1;
                    Action::Continue
                }
                Event::Interrupt => {
                    self.interrupts += 1;
                    Action::Continue
                }
            }
        }

        fn paint(&mut self, out: &mut OutputBuffer, size: Size) {
            self.sizes.push(size);
            out.push_str(&format!("[{}]", self.keys));
        }
    }

    const fn char_key(c: char) -> Event {
        Event::Key(KeyEvent::Char(c))
    }

    const ESC: Event = Event::Key(KeyEvent::Named(NamedKey::Esc));

    fn run_script(script: Script, app: &mut Counter) -> io::Result<String> {
        let mut out = Vec::new();
        EventLoop::new(script).drive(app, &mut out, || Size::FALLBACK)?;
        Ok(String::from_utf8(out).unwrap())
    }

    // ── Frames ──────────────────────────────────────────────────────

    #[test]
    fn paints_initial_frame_then_one_per_event() {
        let mut app = Counter::default();
        let out = run_script(Script::keys([char_key('a'), char_key('b'), ESC]), &mut app).unwrap();
        assert_eq!(out, "[0][1][2]\x1b[1;1H\x1b[2J");
        assert_eq!(app.keys, 2);
    }

    #[test]
    fn quit_clears_screen_without_painting() {
        let mut app = Counter::default();
        let out = run_script(Script::keys([ESC]), &mut app).unwrap();
        assert_eq!(out, "[0]\x1b[1;1H\x1b[2J");
        assert_eq!(app.sizes.len(), 1);
    }

    #[test]
    fn interrupt_does_not_stop_loop() {
        let mut app = Counter::default();
        let out = run_script(
            Script::keys([Event::Interrupt, char_key('x'), ESC]),
            &mut app,
        )
        .unwrap();
        assert_eq!(app.interrupts, 1);
        assert_eq!(app.keys, 1);
        assert!(out.ends_with("\x1b[2J"));
    }

    #[test]
    fn closed_input_ends_cleanly() {
        let mut app = Counter::default();
        let out = run_script(Script::keys([char_key('z')]), &mut app).unwrap();
        assert_eq!(out, "[0][1]\x1b[1;1H\x1b[2J");
    }

    #[test]
    fn read_errors_propagate() {
        let script = Script(VecDeque::from([Err(io::Error::other("tty gone"))]));
        let mut app = Counter::default();
        let err = run_script(script, &mut app).unwrap_err();
        assert_eq!(err.to_string(), "tty gone");
    }

    #[test]
    fn size_is_queried_for_every_frame() {
        let mut app = Counter::default();
        let calls = std::cell::Cell::new(0u16);
        let mut out = Vec::new();
        EventLoop::new(Script::keys([char_key('a'), ESC]))
            .drive(&mut app, &mut out, || {
                calls.set(calls.get() + 1);
                Size {
                    cols: 80 + calls.get(),
                    rows: 24,
                }
            })
            .unwrap();
        assert_eq!(
            app.sizes,
            [Size { cols: 81, rows: 24 }, Size { cols: 82, rows: 24 }]
        );
    }

    // ── Action ──────────────────────────────────────────────────────

    #[test]
    fn action_equality() {
        assert_eq!(Action::Continue, Action::Continue);
        assert_ne!(Action::Continue, Action::Quit);
    }
}
