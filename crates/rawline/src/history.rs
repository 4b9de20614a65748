#![forbid(unsafe_code)]

//! Bounded history with dedup and file persistence.
//!
//! The newest entry sits at the tail. Adding the same line twice in a row
//! stores it once; hitting capacity drops the oldest entry. Entries never
//! contain `\n` or `\r` — the persisted format is one line per entry, and
//! an embedded newline would corrupt it on the way back in.
//!
//! During an editing session the tail holds the in-progress line, so that
//! history navigation can stash the current edit and bring it back.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::logging::debug;

/// Default capacity of a fresh history.
pub const DEFAULT_HISTORY_MAX_LEN: usize = 100;

/// Ordered line history, oldest first.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<String>,
    max_len: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Create an empty history with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            max_len: DEFAULT_HISTORY_MAX_LEN,
        }
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry by index, oldest first.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    /// Iterate entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Append a line.
    ///
    /// No-op (returning `false`) when the capacity is zero, when the line
    /// equals the current tail entry, or when it contains `\n`/`\r`.
    pub fn add(&mut self, line: &str) -> bool {
        if self.max_len == 0 {
            return false;
        }
        if line.contains(['\n', '\r']) {
            return false;
        }
        if self.entries.last().is_some_and(|last| last == line) {
            return false;
        }
        if self.entries.len() == self.max_len {
            self.entries.remove(0);
        }
        self.entries.push(line.to_owned());
        true
    }

    /// Change the capacity (`n >= 1`), dropping oldest entries to fit.
    ///
    /// Returns `false` and leaves the history untouched when `n` is zero.
    pub fn set_max_len(&mut self, n: usize) -> bool {
        if n == 0 {
            return false;
        }
        if self.entries.len() > n {
            self.entries.drain(..self.entries.len() - n);
        }
        self.max_len = n;
        true
    }

    /// Write the history to `path`, one entry per line, creating the file
    /// with owner-only permissions.
    ///
    /// The file is opened create-or-truncate and written in place (no
    /// rename); a failure mid-write can leave it partially written, but
    /// the in-memory history is untouched.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(path).map_err(Error::Write)?;
        let mut writer = BufWriter::new(file);
        for entry in &self.entries {
            writer
                .write_all(entry.as_bytes())
                .and_then(|()| writer.write_all(b"\n"))
                .map_err(Error::Write)?;
        }
        writer.flush().map_err(Error::Write)?;
        debug!(entries = self.entries.len(), path = %path.display(), "history saved");
        Ok(())
    }

    /// Read entries from `path`, stripping line endings and feeding each
    /// through [`add`](Self::add). Returns how many lines were read.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let file = File::open(path).map_err(Error::Read)?;
        let mut reader = BufReader::new(file);
        let mut line = String::new();
        let mut count = 0;
        loop {
            line.clear();
            let n = read_line_lossy(&mut reader, &mut line).map_err(Error::Read)?;
            if n == 0 {
                break;
            }
            while line.ends_with(['\n', '\r']) {
                line.pop();
            }
            self.add(&line);
            count += 1;
        }
        debug!(lines = count, path = %path.display(), "history loaded");
        Ok(count)
    }

    // ── Session support ──────────────────────────────────────────────────
    //
    // The editing loop keeps the in-progress line as the tail entry so
    // that Up/Down can stash and restore it.

    /// Push the tentative in-progress entry at session start.
    pub(crate) fn begin_session(&mut self) {
        if self.max_len == 0 {
            return;
        }
        if self.entries.len() == self.max_len {
            self.entries.remove(0);
        }
        self.entries.push(String::new());
    }

    /// Drop the tentative tail entry when the session ends.
    pub(crate) fn end_session(&mut self) {
        self.entries.pop();
    }

    /// Overwrite the entry `index_from_newest` steps back from the tail.
    pub(crate) fn stash(&mut self, index_from_newest: usize, line: &str) {
        let len = self.entries.len();
        if let Some(slot) = len
            .checked_sub(1 + index_from_newest)
            .and_then(|i| self.entries.get_mut(i))
        {
            slot.clear();
            slot.push_str(line);
        }
    }

    /// Entry `index_from_newest` steps back from the tail.
    #[must_use]
    pub(crate) fn recall(&self, index_from_newest: usize) -> Option<&str> {
        let len = self.entries.len();
        len.checked_sub(1 + index_from_newest)
            .map(|i| self.entries[i].as_str())
    }
}

/// `BufRead::read_line` that tolerates invalid UTF-8 by replacement.
fn read_line_lossy(reader: &mut impl BufRead, out: &mut String) -> io::Result<usize> {
    let mut bytes = Vec::new();
    let n = reader.read_until(b'\n', &mut bytes)?;
    out.push_str(&String::from_utf8_lossy(&bytes));
    Ok(n)
}
