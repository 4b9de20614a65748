#![forbid(unsafe_code)]

//! Terminal port: the capability set the engine needs from a terminal.
//!
//! The engine never touches the platform directly. Everything it does to a
//! terminal goes through [`TerminalPort`]: raw-mode entry/exit, single-byte
//! reads with a timeout, whole-buffer writes, the column count, and a
//! screen clear. `rawline-tty` implements the trait for Unix terminals;
//! [`MemoryTerminal`] implements it over scripted bytes for tests and for
//! embedding the engine in a host that owns its own I/O.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use crate::error::{Error, Result};

/// Capabilities the editing engine requires from a terminal backend.
///
/// Timeout semantics for [`read_byte`](Self::read_byte): `None` blocks
/// until a byte arrives, `Some(Duration::ZERO)` is a non-blocking poll, and
/// any other `Some` waits at most that long. `Ok(None)` means the timeout
/// elapsed. A backend signals end of stream with an
/// [`io::ErrorKind::UnexpectedEof`] error, which the engine folds into its
/// end-of-input outcome.
pub trait TerminalPort {
    /// Switch the input handle to raw mode (no line buffering, no echo, no
    /// signal generation). Idempotent. Fails with [`Error::NotTty`] when
    /// the handle is not a terminal.
    fn enter_raw(&mut self) -> Result<()>;

    /// Restore the mode saved by the matching [`enter_raw`](Self::enter_raw).
    fn leave_raw(&mut self) -> Result<()>;

    /// Read exactly one byte, honoring the timeout. See the trait docs for
    /// the timeout contract.
    fn read_byte(&mut self, timeout: Option<Duration>) -> io::Result<Option<u8>>;

    /// Write the whole buffer; partial writes are the backend's problem.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Whether the input handle is a terminal.
    fn is_tty(&self) -> bool;

    /// Current terminal width in columns, 80 when unknown.
    fn columns(&mut self) -> u16;

    /// Clear the screen and home the cursor.
    fn clear_screen(&mut self) -> io::Result<()> {
        self.write(b"\x1b[H\x1b[2J")
    }
}

impl<P: TerminalPort + ?Sized> TerminalPort for &mut P {
    fn enter_raw(&mut self) -> Result<()> {
        (**self).enter_raw()
    }
    fn leave_raw(&mut self) -> Result<()> {
        (**self).leave_raw()
    }
    fn read_byte(&mut self, timeout: Option<Duration>) -> io::Result<Option<u8>> {
        (**self).read_byte(timeout)
    }
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes)
    }
    fn is_tty(&self) -> bool {
        (**self).is_tty()
    }
    fn columns(&mut self) -> u16 {
        (**self).columns()
    }
    fn clear_screen(&mut self) -> io::Result<()> {
        (**self).clear_screen()
    }
}

// ── Scripted terminal for tests and embedding ────────────────────────────

/// One scripted input step: a byte, or a forced timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scripted {
    Byte(u8),
    Timeout,
}

/// In-memory terminal: scripted input bytes, captured output, fixed width.
///
/// Timed reads that find the script empty report a timeout; blocking reads
/// report end of stream. [`feed_timeout`](Self::feed_timeout) scripts an
/// explicit timeout between bytes, which is how a test says "the user
/// pressed Escape and nothing followed". This is what lets the whole
/// editing loop run in a plain unit test, the same dependency-injection
/// seam the blocking and non-blocking APIs share in production.
#[derive(Debug)]
pub struct MemoryTerminal {
    input: VecDeque<Scripted>,
    output: Vec<u8>,
    cols: u16,
    tty: bool,
    raw: bool,
    cleared: usize,
}

impl MemoryTerminal {
    /// Create a terminal with the given column count.
    #[must_use]
    pub fn new(cols: u16) -> Self {
        Self {
            input: VecDeque::new(),
            output: Vec::new(),
            cols,
            tty: true,
            raw: false,
            cleared: 0,
        }
    }

    /// Create a terminal that reports not being a tty.
    #[must_use]
    pub fn piped(cols: u16) -> Self {
        Self {
            tty: false,
            ..Self::new(cols)
        }
    }

    /// Queue input bytes for the editor to read.
    pub fn feed_bytes(&mut self, bytes: &[u8]) {
        self.input.extend(bytes.iter().map(|&b| Scripted::Byte(b)));
    }

    /// Script one timeout: the next timed read reports nothing arrived.
    pub fn feed_timeout(&mut self) {
        self.input.push_back(Scripted::Timeout);
    }

    /// Queue a string followed by a carriage return (one "typed line").
    pub fn feed_line(&mut self, line: &str) {
        self.feed_bytes(line.as_bytes());
        self.feed_bytes(b"\r");
    }

    /// Everything the editor has written so far.
    #[must_use]
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Take and clear the captured output.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    /// Whether the terminal is currently in raw mode.
    #[must_use]
    pub fn is_raw(&self) -> bool {
        self.raw
    }

    /// How many times the screen was cleared.
    #[must_use]
    pub fn clear_count(&self) -> usize {
        self.cleared
    }

    /// Change the reported column count (takes effect at the next refresh).
    pub fn set_columns(&mut self, cols: u16) {
        self.cols = cols;
    }
}

impl TerminalPort for MemoryTerminal {
    fn enter_raw(&mut self) -> Result<()> {
        if !self.tty {
            return Err(Error::NotTty);
        }
        self.raw = true;
        Ok(())
    }

    fn leave_raw(&mut self) -> Result<()> {
        self.raw = false;
        Ok(())
    }

    fn read_byte(&mut self, timeout: Option<Duration>) -> io::Result<Option<u8>> {
        loop {
            match self.input.pop_front() {
                Some(Scripted::Byte(b)) => return Ok(Some(b)),
                Some(Scripted::Timeout) if timeout.is_some() => return Ok(None),
                // A blocking read cannot time out; skip the marker.
                Some(Scripted::Timeout) => {}
                // A timed read with nothing scripted is a timeout; a
                // blocking read is the end of the script.
                None if timeout.is_some() => return Ok(None),
                None => return Err(io::ErrorKind::UnexpectedEof.into()),
            }
        }
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.output.extend_from_slice(bytes);
        Ok(())
    }

    fn is_tty(&self) -> bool {
        self.tty
    }

    fn columns(&mut self) -> u16 {
        self.cols
    }

    fn clear_screen(&mut self) -> io::Result<()> {
        self.cleared += 1;
        self.write(b"\x1b[H\x1b[2J")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_bytes_come_back_in_order() {
        let mut term = MemoryTerminal::new(80);
        term.feed_bytes(b"ab");
        assert_eq!(term.read_byte(None).unwrap(), Some(b'a'));
        assert_eq!(term.read_byte(None).unwrap(), Some(b'b'));
    }

    #[test]
    fn empty_timed_read_is_timeout() {
        let mut term = MemoryTerminal::new(80);
        assert_eq!(
            term.read_byte(Some(Duration::from_millis(10))).unwrap(),
            None
        );
    }

    #[test]
    fn empty_blocking_read_is_stream_end() {
        let mut term = MemoryTerminal::new(80);
        let err = term.read_byte(None).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn piped_terminal_refuses_raw_mode() {
        let mut term = MemoryTerminal::piped(80);
        assert!(!term.is_tty());
        assert!(matches!(term.enter_raw(), Err(Error::NotTty)));
    }

    #[test]
    fn raw_mode_round_trip() {
        let mut term = MemoryTerminal::new(80);
        term.enter_raw().unwrap();
        assert!(term.is_raw());
        term.leave_raw().unwrap();
        assert!(!term.is_raw());
    }
}
