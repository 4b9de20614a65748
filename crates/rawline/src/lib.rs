#![forbid(unsafe_code)]

//! Raw-mode line editing engine.
//!
//! rawline is a small, self-contained replacement for readline-style
//! libraries: a prompt at which a user types and edits one line of text
//! with the usual cursor, deletion, history, and completion bindings, with
//! correct handling of grapheme clusters (CJK, emoji, ZWJ sequences, skin
//! tones) both in the buffer and on the screen.
//!
//! The crate is organized the way the editing loop flows:
//! - [`term`] — the [`TerminalPort`] capability trait the engine drives,
//!   plus [`MemoryTerminal`] for tests and embedding,
//! - [`key`] — raw input bytes to logical [`Key`] events, with the
//!   escape-sequence timeout discipline,
//! - [`buffer`] — the grapheme-aware edit buffer mutations,
//! - [`render`] — single-line (horizontal scroll) and multi-line frame
//!   rendering over six VT100 sequences, assembled into one write,
//! - [`history`] — bounded dedup history with `0600` file persistence,
//! - [`completion`] — the Tab-cycle protocol over application candidates,
//! - [`editor`] — the per-instance [`Editor`] context, the blocking
//!   [`Editor::read`], and the non-blocking [`EditSession`] state machine.
//!
//! # Example
//! ```no_run
//! use rawline::{Editor, MemoryTerminal};
//!
//! let mut term = MemoryTerminal::new(80);
//! term.feed_bytes(b"hello\r");
//! let mut editor = Editor::new();
//! let line = editor.read(&mut term, "> ").unwrap();
//! assert_eq!(line, "hello");
//! ```

pub mod buffer;
pub mod completion;
pub mod editor;
pub mod error;
pub mod history;
pub mod key;
mod logging;
pub mod render;
pub mod term;

mod frame;

pub use buffer::{Capacity, LineBuffer};
pub use editor::{
    CompletionFn, DEFAULT_LINE_CAPACITY, EditSession, Editor, Feed, HighlightFn, Hint, HintsFn,
};
pub use error::{Error, Result};
pub use history::{DEFAULT_HISTORY_MAX_LEN, History};
pub use key::{Key, KeyDecoder};
pub use term::{MemoryTerminal, TerminalPort};
