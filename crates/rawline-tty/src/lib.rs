#![forbid(unsafe_code)]

//! Unix terminal backend for rawline.
//!
//! Implements [`rawline::TerminalPort`] over the controlling terminal:
//! - raw mode via termios (`tcgetattr`/`cfmakeraw`/`tcsetattr`, restored
//!   with `TCSAFLUSH` on the way out),
//! - single-byte reads with a `poll(2)` timeout,
//! - column count from the winsize ioctl, falling back to the `ESC [6n`
//!   cursor-position probe, falling back to 80,
//! - a process-wide restore hook: the saved termios lives in a global slot
//!   and a once-installed panic hook plus a SIGTERM/SIGHUP watcher thread
//!   put the terminal back even when the process dies mid-edit.
//!
//! Environment overrides for driving the editor through pipes in tests:
//! `RAWLINE_ASSUME_TTY` skips terminal setup and reports a tty,
//! `RAWLINE_COLS` fixes the column count.

#[cfg(unix)]
mod unix;

#[cfg(unix)]
pub use unix::UnixTerminal;
