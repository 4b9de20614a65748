#![forbid(unsafe_code)]

//! The per-instance editor context and the editing loop.
//!
//! An [`Editor`] owns everything that outlives a single line: history,
//! mode flags, the escape timeout, and the application callbacks. A single
//! line is edited by an [`EditSession`], either driven to completion by
//! the blocking [`Editor::read`] or fed one key event at a time from an
//! event loop via [`EditSession::feed`] — the session is an explicit state
//! machine, and [`Feed::More`] means "call `feed` again when the input
//! handle is ready".
//!
//! Separate editors share nothing; two editors driving the same terminal
//! at once is on the caller. Raw mode is restored on every exit path: the
//! session restores it in `stop` and again on drop if `stop` was skipped.

use std::time::Duration;

use crate::buffer::{Capacity, LineBuffer};
use crate::completion::CompletionCycle;
use crate::error::{Error, Result};
use crate::history::History;
use crate::key::{DEFAULT_ESCAPE_TIMEOUT, Key, KeyDecoder};
use crate::logging::{debug, trace};
use crate::render::{Geometry, Refresh, View, refresh};
use crate::term::TerminalPort;

/// Fixed capacity used by the blocking [`Editor::read`].
pub const DEFAULT_LINE_CAPACITY: usize = 4096;

/// Terminals that cannot interpret the escape sequences we emit.
const UNSUPPORTED_TERMS: &[&str] = &["dumb", "cons25", "emacs"];

/// Completion callback: current buffer in, candidate lines out. The
/// returned list lives for one completion cycle and is dropped when the
/// cycle ends.
pub type CompletionFn = dyn Fn(&str) -> Vec<String>;

/// Hints callback: current buffer in, optional right-of-cursor hint out.
/// The returned [`Hint`] is dropped after one render.
pub type HintsFn = dyn Fn(&str) -> Option<Hint>;

/// Highlight callback: paints one color code per *byte* of the buffer.
/// Codes: 0 = default, 1..=7 = red..white, +8 = bold.
pub type HighlightFn = dyn Fn(&str, &mut [u8]);

/// Advisory text rendered to the right of the cursor at end of line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    /// The hint text.
    pub text: String,
    /// Color code 0..=7 (0 = default; bold-only hints render white).
    pub color: u8,
    /// Render bold.
    pub bold: bool,
}

impl Hint {
    /// An unstyled hint.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: 0,
            bold: false,
        }
    }

    /// Set the color code (builder).
    #[must_use]
    pub fn with_color(mut self, color: u8) -> Self {
        self.color = color & 7;
        self
    }

    /// Set bold (builder).
    #[must_use]
    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }
}

/// Outcome of one [`EditSession::feed`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
    /// Editing continues; call `feed` again when input is ready.
    More,
    /// The user accepted the line with Enter.
    Line(String),
}

// ── Editor ───────────────────────────────────────────────────────────────

/// Per-instance editing context: history, configuration, callbacks.
#[derive(Default)]
pub struct Editor {
    history: History,
    multiline: bool,
    mask: bool,
    escape_timeout: Option<Duration>,
    pub(crate) completion: Option<Box<CompletionFn>>,
    hints: Option<Box<HintsFn>>,
    highlight: Option<Box<HighlightFn>>,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("history_len", &self.history.len())
            .field("multiline", &self.multiline)
            .field("mask", &self.mask)
            .field("completion", &self.completion.is_some())
            .field("hints", &self.hints.is_some())
            .field("highlight", &self.highlight.is_some())
            .finish()
    }
}

impl Editor {
    /// Create an editor with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Configuration ────────────────────────────────────────────────────

    /// Enable multi-line rendering (builder).
    #[must_use]
    pub fn with_multiline(mut self, on: bool) -> Self {
        self.multiline = on;
        self
    }

    /// Enable mask mode (builder): render `*` per cluster, for passwords.
    #[must_use]
    pub fn with_mask_mode(mut self, on: bool) -> Self {
        self.mask = on;
        self
    }

    /// Enable or disable multi-line rendering.
    pub fn set_multiline(&mut self, on: bool) {
        self.multiline = on;
    }

    /// Enable or disable mask mode.
    pub fn set_mask_mode(&mut self, on: bool) {
        self.mask = on;
    }

    /// Override the escape-sequence / cluster-coalescing timeout
    /// (default 100 ms).
    pub fn set_escape_timeout(&mut self, timeout: Duration) {
        self.escape_timeout = Some(timeout);
    }

    /// Install the Tab-completion callback.
    pub fn set_completion_callback(&mut self, cb: impl Fn(&str) -> Vec<String> + 'static) {
        self.completion = Some(Box::new(cb));
    }

    /// Install the hints callback.
    pub fn set_hints_callback(&mut self, cb: impl Fn(&str) -> Option<Hint> + 'static) {
        self.hints = Some(Box::new(cb));
    }

    /// Install the highlight callback.
    pub fn set_highlight_callback(&mut self, cb: impl Fn(&str, &mut [u8]) + 'static) {
        self.highlight = Some(Box::new(cb));
    }

    // ── History ──────────────────────────────────────────────────────────

    /// The editor's history.
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Append a line to history (dedup against the tail).
    pub fn history_add(&mut self, line: &str) -> bool {
        self.history.add(line)
    }

    /// Change the history capacity.
    pub fn history_set_max_len(&mut self, n: usize) -> bool {
        self.history.set_max_len(n)
    }

    /// Persist the history to a file (owner read/write only).
    pub fn history_save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        self.history.save(path)
    }

    /// Load history entries from a file.
    pub fn history_load(&mut self, path: impl AsRef<std::path::Path>) -> Result<usize> {
        self.history.load(path)
    }

    // ── Editing ──────────────────────────────────────────────────────────

    /// Blocking line read: prompt, edit, return the accepted line.
    ///
    /// On a non-terminal input handle this degrades to a plain unbounded
    /// line read with no editing; on a terminal that cannot handle escape
    /// sequences (`$TERM` = dumb/cons25/emacs) the prompt is printed and a
    /// plain read follows. Ctrl-C yields [`Error::Interrupted`], Ctrl-D on
    /// an empty line yields [`Error::Eof`].
    pub fn read<P: TerminalPort + ?Sized>(&mut self, port: &mut P, prompt: &str) -> Result<String> {
        if !port.is_tty() {
            return read_plain(port);
        }
        if is_unsupported_term() {
            port.write(prompt.as_bytes()).map_err(Error::Write)?;
            return read_plain(port);
        }

        let mut session =
            EditSession::start(self, port, prompt, Capacity::Fixed(DEFAULT_LINE_CAPACITY))?;
        let result = loop {
            match session.feed() {
                Ok(Feed::More) => {}
                Ok(Feed::Line(line)) => break Ok(line),
                Err(err) => break Err(err),
            }
        };
        session.stop();
        result
    }

    /// Start a non-blocking editing session: enter raw mode, print the
    /// prompt, and hand back the session state machine.
    pub fn edit_start<'a, P: TerminalPort + ?Sized>(
        &'a mut self,
        port: &'a mut P,
        prompt: &'a str,
        capacity: Capacity,
    ) -> Result<EditSession<'a, P>> {
        EditSession::start(self, port, prompt, capacity)
    }
}

fn is_unsupported_term() -> bool {
    // $TERM describes the process's own terminal; the denylist only means
    // something when we are actually attached to one.
    use std::io::IsTerminal;
    if !std::io::stdin().is_terminal() {
        return false;
    }
    std::env::var("TERM").is_ok_and(|term| {
        UNSUPPORTED_TERMS
            .iter()
            .any(|t| term.eq_ignore_ascii_case(t))
    })
}

/// Line-oriented fallback read: no editing, no length limit.
fn read_plain<P: TerminalPort + ?Sized>(port: &mut P) -> Result<String> {
    let mut bytes = Vec::new();
    loop {
        match port.read_byte(None) {
            Ok(Some(b'\n')) => break,
            Ok(Some(b)) => bytes.push(b),
            Ok(None) => break,
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                if bytes.is_empty() {
                    return Err(Error::Eof);
                }
                break;
            }
            Err(err) => return Err(Error::Read(err)),
        }
    }
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ── EditSession ──────────────────────────────────────────────────────────

/// One line being edited on one terminal.
///
/// Created by [`Editor::edit_start`]; drive it with [`feed`](Self::feed)
/// whenever the input handle has data, then call [`stop`](Self::stop).
/// Dropping a session without stopping it still restores the terminal.
pub struct EditSession<'a, P: TerminalPort + ?Sized> {
    pub(crate) editor: &'a mut Editor,
    pub(crate) port: &'a mut P,
    pub(crate) prompt: &'a str,
    pub(crate) buf: LineBuffer,
    pub(crate) decoder: KeyDecoder,
    pub(crate) geom: Geometry,
    pub(crate) cols: usize,
    pub(crate) history_index: usize,
    pub(crate) completion: Option<CompletionCycle>,
    stopped: bool,
}

impl<'a, P: TerminalPort + ?Sized> EditSession<'a, P> {
    fn start(
        editor: &'a mut Editor,
        port: &'a mut P,
        prompt: &'a str,
        capacity: Capacity,
    ) -> Result<Self> {
        let buf = LineBuffer::new(capacity)?;
        port.enter_raw()?;
        let cols = usize::from(port.columns());

        // The session's in-progress line lives as the history tail so that
        // Up/Down can stash and restore it.
        editor.history.begin_session();

        if let Err(err) = port.write(prompt.as_bytes()) {
            editor.history.end_session();
            let _ = port.leave_raw();
            return Err(Error::Write(err));
        }

        let timeout = editor.escape_timeout.unwrap_or(DEFAULT_ESCAPE_TIMEOUT);
        trace!(cols, "edit session started");
        Ok(Self {
            editor,
            port,
            prompt,
            buf,
            decoder: KeyDecoder::new(timeout),
            geom: Geometry::new(),
            cols,
            history_index: 0,
            completion: None,
            stopped: false,
        })
    }

    /// The line as currently edited.
    #[must_use]
    pub fn line(&self) -> &str {
        self.buf.as_str()
    }

    /// Process one key event.
    ///
    /// Blocks on the first input byte (an event loop should call this only
    /// when the handle is readable; the remaining bytes of an escape
    /// sequence are read under the escape timeout).
    pub fn feed(&mut self) -> Result<Feed> {
        let key = match self.decoder.read_key(&mut *self.port) {
            Ok(key) => key,
            Err(err) => {
                // The stream ended or broke mid-session: the tentative
                // history entry must not outlive the session.
                self.editor.history.end_session();
                return Err(err);
            }
        };

        // Tab enters the completion cycle; while it is active, every key
        // routes through it first.
        let key = if (self.completion.is_some() || key == Key::Tab)
            && self.editor.completion.is_some()
        {
            match self.completion_step(key)? {
                Some(key) => key,
                None => return Ok(Feed::More),
            }
        } else {
            key
        };

        match key {
            Key::Enter => {
                self.editor.history.end_session();
                if self.editor.multiline && self.buf.move_end() {
                    self.refresh();
                }
                if self.editor.hints.is_some() {
                    // Redraw once without the hint so the accepted line is
                    // left on screen exactly as typed.
                    self.refresh_without_hints();
                }
                debug!(len = self.buf.len(), "line accepted");
                return Ok(Feed::Line(self.buf.as_str().to_owned()));
            }
            Key::Ctrl('c') => {
                self.editor.history.end_session();
                return Err(Error::Interrupted);
            }
            Key::Ctrl('d') => {
                if self.buf.is_empty() {
                    self.editor.history.end_session();
                    return Err(Error::Eof);
                }
                if self.buf.delete_forward() {
                    self.refresh();
                }
            }
            Key::Insert(bytes) => {
                if let Ok(cluster) = std::str::from_utf8(&bytes) {
                    self.insert(cluster)?;
                }
            }
            Key::Backspace => {
                if self.buf.backspace() {
                    self.refresh();
                }
            }
            Key::Delete => {
                if self.buf.delete_forward() {
                    self.refresh();
                }
            }
            Key::Left | Key::Ctrl('b') => {
                if self.buf.move_left() {
                    self.refresh();
                }
            }
            Key::Right | Key::Ctrl('f') => {
                if self.buf.move_right() {
                    self.refresh();
                }
            }
            Key::Home | Key::Ctrl('a') => {
                if self.buf.move_home() {
                    self.refresh();
                }
            }
            Key::End | Key::Ctrl('e') => {
                if self.buf.move_end() {
                    self.refresh();
                }
            }
            Key::Up | Key::Ctrl('p') => self.history_move(true),
            Key::Down | Key::Ctrl('n') => self.history_move(false),
            Key::Ctrl('t') => {
                if self.buf.transpose() {
                    self.refresh();
                }
            }
            Key::Ctrl('u') => {
                self.buf.kill_line();
                self.refresh();
            }
            Key::Ctrl('k') => {
                self.buf.kill_to_end();
                self.refresh();
            }
            Key::Ctrl('w') => {
                if self.buf.delete_prev_word() {
                    self.refresh();
                }
            }
            Key::Ctrl('l') => {
                let _ = self.port.clear_screen();
                self.refresh();
            }
            Key::Esc | Key::Tab | Key::Ctrl(_) => {}
        }
        Ok(Feed::More)
    }

    /// End the session: restore the terminal and move to a fresh line.
    pub fn stop(mut self) {
        self.finish();
    }

    /// Erase the rendered prompt and line without touching the edit state,
    /// so the application can print something else.
    pub fn hide(&mut self) {
        self.refresh_flags(Refresh::CLEAN);
    }

    /// Redraw the prompt and line after [`hide`](Self::hide).
    pub fn show(&mut self) {
        if self.completion.is_some() {
            self.refresh_candidate(Refresh::WRITE);
        } else {
            self.refresh_flags(Refresh::WRITE);
        }
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn insert(&mut self, cluster: &str) -> Result<()> {
        if !self.buf.insert(cluster)? {
            // Fixed buffer full: dropped silently.
            return Ok(());
        }

        let appended = self.buf.at_end();
        let plain = !self.editor.multiline
            && self.editor.hints.is_none()
            && self.editor.highlight.is_none();
        if appended
            && plain
            && rawline_text::display_width(self.prompt.as_bytes()) + self.buf.width() < self.cols
        {
            // Trivial append: echo just the new cluster, no full redraw.
            let echo: &[u8] = if self.editor.mask {
                b"*"
            } else {
                cluster.as_bytes()
            };
            self.port.write(echo).map_err(Error::Write)?;
        } else {
            self.refresh();
        }
        Ok(())
    }

    fn history_move(&mut self, to_older: bool) {
        let len = self.editor.history.len();
        if len <= 1 {
            return;
        }
        // Stash the line being left so it can be come back to.
        self.editor.history.stash(self.history_index, self.buf.as_str());
        if to_older {
            if self.history_index + 1 >= len {
                return;
            }
            self.history_index += 1;
        } else {
            if self.history_index == 0 {
                return;
            }
            self.history_index -= 1;
        }
        if let Some(entry) = self.editor.history.recall(self.history_index) {
            let owned = entry.to_owned();
            self.buf.set_text(&owned);
            self.refresh();
        }
    }

    pub(crate) fn refresh(&mut self) {
        self.refresh_flags(Refresh::ALL);
    }

    fn refresh_flags(&mut self, flags: Refresh) {
        self.cols = usize::from(self.port.columns());
        let view = View {
            prompt: self.prompt,
            buf: self.buf.as_str(),
            pos: self.buf.pos(),
            cols: self.cols,
            mask: self.editor.mask,
            hints: self.editor.hints.as_deref(),
            highlight: self.editor.highlight.as_deref(),
        };
        refresh(
            &mut *self.port,
            &view,
            &mut self.geom,
            self.editor.multiline,
            flags,
        );
    }

    fn refresh_without_hints(&mut self) {
        self.cols = usize::from(self.port.columns());
        let view = View {
            prompt: self.prompt,
            buf: self.buf.as_str(),
            pos: self.buf.pos(),
            cols: self.cols,
            mask: self.editor.mask,
            hints: None,
            highlight: self.editor.highlight.as_deref(),
        };
        refresh(
            &mut *self.port,
            &view,
            &mut self.geom,
            self.editor.multiline,
            Refresh::ALL,
        );
    }

    /// Render the active completion candidate in place of the buffer.
    pub(crate) fn refresh_candidate(&mut self, flags: Refresh) {
        let candidate = match &self.completion {
            None => return,
            Some(cycle) => cycle.current().map(str::to_owned),
        };
        let Some(candidate) = candidate else {
            self.refresh_flags(flags);
            return;
        };
        self.cols = usize::from(self.port.columns());
        let view = View {
            prompt: self.prompt,
            buf: &candidate,
            pos: candidate.len(),
            cols: self.cols,
            mask: self.editor.mask,
            hints: self.editor.hints.as_deref(),
            highlight: self.editor.highlight.as_deref(),
        };
        refresh(
            &mut *self.port,
            &view,
            &mut self.geom,
            self.editor.multiline,
            flags,
        );
    }

    pub(crate) fn bell(&mut self) {
        let _ = self.port.write(b"\x07");
    }

    fn finish(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        let _ = self.port.leave_raw();
        let _ = self.port.write(b"\n");
        trace!("edit session stopped");
    }
}

impl<P: TerminalPort + ?Sized> Drop for EditSession<'_, P> {
    fn drop(&mut self) {
        self.finish();
    }
}
