use std::fs::File;
use std::io::{self, IsTerminal, Read, Write};
use std::os::fd::AsFd;
use std::sync::{Mutex, Once};
use std::time::Duration;

use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::termios::{self, SetArg, Termios};
use signal_hook::consts::signal::{SIGHUP, SIGTERM};
use signal_hook::iterator::Signals;

use rawline::{Error, Result, TerminalPort};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

#[cfg(not(feature = "tracing"))]
macro_rules! trace {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "tracing"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

/// Column fallback when every query fails.
const FALLBACK_COLS: u16 = 80;

// ── Process-wide restore slot ────────────────────────────────────────────
//
// The one legitimate piece of global state: the termios to restore when
// the process dies abnormally. Filled on raw-mode entry, cleared on leave.

static SAVED_TERMIOS: Mutex<Option<Termios>> = Mutex::new(None);
static EXIT_HOOK: Once = Once::new();

fn restore_slot() -> std::sync::MutexGuard<'static, Option<Termios>> {
    SAVED_TERMIOS
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Put the terminal back if raw mode is still active.
fn restore_terminal() {
    if let Some(orig) = restore_slot().take()
        && let Ok(tty) = File::open("/dev/tty")
    {
        let _ = termios::tcsetattr(&tty, SetArg::TCSAFLUSH, &orig);
    }
}

fn install_exit_hook() {
    EXIT_HOOK.call_once(|| {
        // Panics unwind through Drop, but a hook also covers aborts via
        // panic handlers that never return to the guard.
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            restore_terminal();
            previous(info);
        }));

        // Raw mode disables ISIG, so Ctrl-C never raises a signal; TERM
        // and HUP from outside still can.
        if let Ok(mut signals) = Signals::new([SIGTERM, SIGHUP]) {
            std::thread::spawn(move || {
                if let Some(signal) = signals.forever().next() {
                    restore_terminal();
                    std::process::exit(128 + signal);
                }
            });
        }
    });
}

// ── Terminal ─────────────────────────────────────────────────────────────

/// The controlling Unix terminal as a [`TerminalPort`].
///
/// Input bytes come from `/dev/tty` (unbuffered, pollable); when stdin is
/// not a terminal the port reports so and reads stdin instead, which is
/// what the editor's plain-read degradation path uses. Output goes to
/// stdout.
#[derive(Debug, Default)]
pub struct UnixTerminal {
    /// Open while raw mode is active; also the fd for input and termios.
    tty: Option<File>,
    /// Original termios, present while raw mode is active.
    saved: Option<Termios>,
}

impl UnixTerminal {
    /// Create a port over the controlling terminal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn assume_tty() -> bool {
        std::env::var_os("RAWLINE_ASSUME_TTY").is_some()
    }

    fn open_tty(&mut self) -> io::Result<&File> {
        if self.tty.is_none() {
            self.tty = Some(File::open("/dev/tty")?);
        }
        Ok(self.tty.as_ref().expect("just opened"))
    }

    fn read_input_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        let n = loop {
            let result = match &mut self.tty {
                Some(tty) => tty.read(&mut byte),
                // Degraded (non-tty) mode reads stdin directly.
                None => io::stdin().lock().read(&mut byte),
            };
            match result {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        };
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        Ok(Some(byte[0]))
    }

    /// Wait for input on the tty, at most `timeout`. True means readable.
    fn poll_input(&mut self, timeout: Duration) -> io::Result<bool> {
        let Some(tty) = &self.tty else {
            // Pipes have no timeout semantics worth modeling; pretend
            // readable and let the read block.
            return Ok(true);
        };
        let mut fds = [PollFd::new(tty.as_fd(), PollFlags::POLLIN)];
        let timeout_ms: u16 = timeout.as_millis().try_into().unwrap_or(u16::MAX);
        match poll(&mut fds, PollTimeout::from(timeout_ms)) {
            Ok(n) => Ok(n > 0),
            Err(nix::errno::Errno::EINTR) => Ok(false),
            Err(err) => Err(io::Error::other(err)),
        }
    }

    /// Query the cursor column with `ESC [6n`. Needs raw mode.
    fn probe_cursor_column(&mut self) -> Option<u16> {
        self.write(b"\x1b[6n").ok()?;
        let mut response = Vec::with_capacity(16);
        while response.len() < 32 {
            match self.read_byte(Some(Duration::from_millis(100))) {
                Ok(Some(b'R')) => break,
                Ok(Some(b)) => response.push(b),
                _ => return None,
            }
        }
        parse_cursor_report(&response).map(|(_row, col)| col)
    }

    /// The winsize → cursor-probe → fallback chain.
    fn query_columns(&mut self) -> u16 {
        if let Ok(cols) = std::env::var("RAWLINE_COLS")
            && let Ok(cols) = cols.parse::<u16>()
            && cols > 0
        {
            return cols;
        }

        if let Ok(ws) = rustix::termios::tcgetwinsize(io::stdout())
            && ws.ws_col > 0
        {
            return ws.ws_col;
        }

        // ioctl failed: ask the terminal itself. Remember where the cursor
        // is, jump far right, read the column, and come back.
        if self.saved.is_some()
            && let Some(start) = self.probe_cursor_column()
        {
            let _ = self.write(b"\x1b[999C");
            if let Some(cols) = self.probe_cursor_column() {
                if cols > start {
                    let _ = self.write(format!("\x1b[{}D", cols - start).as_bytes());
                }
                debug!(cols, "columns from cursor probe");
                return cols;
            }
        }

        FALLBACK_COLS
    }
}

/// Parse a `ESC [ row ; col` cursor report (the final `R` already eaten).
fn parse_cursor_report(bytes: &[u8]) -> Option<(u16, u16)> {
    let text = std::str::from_utf8(bytes).ok()?;
    let rest = text.strip_prefix("\x1b[")?;
    let (row, col) = rest.split_once(';')?;
    Some((row.parse().ok()?, col.parse().ok()?))
}

impl TerminalPort for UnixTerminal {
    fn enter_raw(&mut self) -> Result<()> {
        if Self::assume_tty() {
            return Ok(());
        }
        if self.saved.is_some() {
            return Ok(());
        }
        if !io::stdin().is_terminal() {
            return Err(Error::NotTty);
        }

        self.open_tty().map_err(|_| Error::NotTty)?;
        let tty = self.tty.as_ref().expect("tty open");
        let original = termios::tcgetattr(tty).map_err(|_| Error::NotTty)?;

        install_exit_hook();
        *restore_slot() = Some(original.clone());

        // cfmakeraw: no echo, no canonical mode, no signals, 8-bit chars,
        // VMIN=1/VTIME=0 so reads deliver every single byte.
        let mut raw = original.clone();
        termios::cfmakeraw(&mut raw);
        termios::tcsetattr(tty, SetArg::TCSAFLUSH, &raw).map_err(|_| {
            restore_slot().take();
            Error::NotTty
        })?;

        self.saved = Some(original);
        trace!("entered raw mode");
        Ok(())
    }

    fn leave_raw(&mut self) -> Result<()> {
        if Self::assume_tty() {
            return Ok(());
        }
        let Some(original) = self.saved.take() else {
            return Ok(());
        };
        restore_slot().take();
        let tty = self.tty.as_ref().expect("raw mode had a tty");
        termios::tcsetattr(tty, SetArg::TCSAFLUSH, &original)
            .map_err(|err| Error::Write(io::Error::other(err)))?;
        trace!("left raw mode");
        Ok(())
    }

    fn read_byte(&mut self, timeout: Option<Duration>) -> io::Result<Option<u8>> {
        if let Some(timeout) = timeout
            && !self.poll_input(timeout)?
        {
            return Ok(None);
        }
        self.read_input_byte()
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(bytes)?;
        stdout.flush()
    }

    fn is_tty(&self) -> bool {
        Self::assume_tty() || io::stdin().is_terminal()
    }

    fn columns(&mut self) -> u16 {
        self.query_columns()
    }
}

impl Drop for UnixTerminal {
    fn drop(&mut self) {
        // Matches the exit hook: never leave the terminal raw behind us.
        let _ = self.leave_raw();
    }
}
