#![forbid(unsafe_code)]

//! Tab-completion cycle.
//!
//! Tab asks the application for candidates and shows the first one in
//! place of the buffer. Further Tabs cycle through the list; one position
//! past the last candidate rings the bell and shows the original line
//! again. Escape reverts to the original line. Any other key accepts the
//! shown candidate into the real buffer and is then processed normally.
//! The candidate list lives exactly as long as the cycle.

use crate::editor::EditSession;
use crate::error::Result;
use crate::key::Key;
use crate::logging::trace;
use crate::render::Refresh;
use crate::term::TerminalPort;

/// State of an active completion cycle.
#[derive(Debug)]
pub(crate) struct CompletionCycle {
    candidates: Vec<String>,
    /// Current position; `candidates.len()` means "back to the original".
    index: usize,
}

impl CompletionCycle {
    /// The candidate currently shown, `None` at the back-to-original slot.
    pub(crate) fn current(&self) -> Option<&str> {
        self.candidates.get(self.index).map(String::as_str)
    }
}

impl<P: TerminalPort + ?Sized> EditSession<'_, P> {
    /// Route one key through the completion cycle.
    ///
    /// Returns `None` when the key was consumed by the cycle, or
    /// `Some(key)` when the key accepted a candidate and should now be
    /// processed as normal input.
    pub(crate) fn completion_step(&mut self, key: Key) -> Result<Option<Key>> {
        if self.completion.is_none() {
            // First Tab: query the callback with the current line.
            let callback = self
                .editor
                .completion
                .as_deref()
                .expect("completion_step requires a completion callback");
            let candidates = callback(self.buf.as_str());
            if candidates.is_empty() {
                self.bell();
                return Ok(None);
            }
            trace!(candidates = candidates.len(), "completion cycle started");
            self.completion = Some(CompletionCycle {
                candidates,
                index: 0,
            });
            self.refresh_candidate(Refresh::ALL);
            return Ok(None);
        }

        match key {
            Key::Tab => {
                let cycle = self.completion.as_mut().expect("cycle is active");
                cycle.index = (cycle.index + 1) % (cycle.candidates.len() + 1);
                if cycle.current().is_none() {
                    // Cycled past the last candidate: original line again.
                    self.bell();
                    self.refresh();
                } else {
                    self.refresh_candidate(Refresh::ALL);
                }
                Ok(None)
            }
            Key::Esc => {
                // Revert to the line as it was before completion.
                let showed_candidate = self
                    .completion
                    .take()
                    .is_some_and(|cycle| cycle.current().is_some());
                if showed_candidate {
                    self.refresh();
                }
                Ok(None)
            }
            other => {
                // Accept the shown candidate, then let the key act on it.
                if let Some(cycle) = self.completion.take() {
                    if let Some(candidate) = cycle.current() {
                        self.buf.set_text(candidate);
                    }
                }
                Ok(Some(other))
            }
        }
    }
}
