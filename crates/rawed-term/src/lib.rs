// SPDX-License-Identifier: MIT
//
// rawed-term: terminal layer for rawed.
//
// Everything that touches the terminal device lives here: the escape
// sequence emitter, the frame output buffer, raw mode as a scoped guard,
// the raw key decoder with its Unix and Windows console backends, and
// the synchronous redraw loop that drives an application.
//
// No TUI framework sits underneath. Sequences are written by hand and
// the terminal is switched into raw mode through termios directly, so
// every byte that reaches the screen is one we chose to send.

pub mod ansi;
pub mod event_loop;
pub mod input;
pub mod output;
pub mod terminal;
