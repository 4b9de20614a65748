#![forbid(unsafe_code)]

//! Append buffer: one render frame assembled before a single write.
//!
//! Every refresh builds its whole byte sequence here and hands it to the
//! terminal port in one call, so a slow terminal never shows a half-drawn
//! line. Only the six VT100 sequences the engine relies on are exposed.

use std::fmt::Write as _;

/// A frame of terminal output under construction.
#[derive(Debug, Default)]
pub(crate) struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn push_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    pub(crate) fn push_str(&mut self, s: &str) {
        self.push_bytes(s.as_bytes());
    }

    /// `\r` — cursor to the left edge.
    pub(crate) fn carriage_return(&mut self) {
        self.bytes.push(b'\r');
    }

    /// `\n` — reserve the next row (multi-line wrap corner).
    pub(crate) fn newline(&mut self) {
        self.bytes.push(b'\n');
    }

    /// `ESC [0K` — erase from the cursor to the end of the line.
    pub(crate) fn erase_to_right(&mut self) {
        self.push_bytes(b"\x1b[0K");
    }

    /// `ESC [nC` — cursor right by `n` columns. No-op when `n` is 0.
    pub(crate) fn cursor_right(&mut self, n: usize) {
        if n > 0 {
            let _ = write!(self.writer(), "\x1b[{n}C");
        }
    }

    /// `ESC [nA` — cursor up by `n` rows. No-op when `n` is 0.
    pub(crate) fn cursor_up(&mut self, n: usize) {
        if n > 0 {
            let _ = write!(self.writer(), "\x1b[{n}A");
        }
    }

    /// `ESC [nB` — cursor down by `n` rows. No-op when `n` is 0.
    pub(crate) fn cursor_down(&mut self, n: usize) {
        if n > 0 {
            let _ = write!(self.writer(), "\x1b[{n}B");
        }
    }

    /// Start a color/bold run. `color` is the callback code 0..=7
    /// (0 = default foreground).
    pub(crate) fn sgr(&mut self, color: u8, bold: bool) {
        let fg = if color == 0 { 39 } else { 30 + u32::from(color & 7) };
        let _ = write!(self.writer(), "\x1b[{};{fg};49m", u8::from(bold));
    }

    /// End a color/bold run.
    pub(crate) fn sgr_reset(&mut self) {
        self.push_bytes(b"\x1b[0m");
    }

    // Adapter so `write!` integer formatting lands straight in the bytes.
    fn writer(&mut self) -> FrameWriter<'_> {
        FrameWriter(&mut self.bytes)
    }
}

struct FrameWriter<'a>(&'a mut Vec<u8>);

impl std::fmt::Write for FrameWriter<'_> {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.0.extend_from_slice(s.as_bytes());
        Ok(())
    }
}
