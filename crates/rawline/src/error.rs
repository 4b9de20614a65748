#![forbid(unsafe_code)]

//! Error taxonomy for the editing engine.
//!
//! [`Error::Eof`] and [`Error::Interrupted`] are expected control flow: the
//! user ended input with Ctrl-D on an empty line or pressed Ctrl-C. Callers
//! should match on them rather than treating every error as fatal.

use std::io;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while editing.
#[derive(Debug, Error)]
pub enum Error {
    /// Ctrl-D on an empty buffer, or the input stream ended.
    #[error("end of input")]
    Eof,

    /// Ctrl-C.
    #[error("interrupted")]
    Interrupted,

    /// Editing was requested on a handle that is not a terminal.
    #[error("input handle is not a terminal")]
    NotTty,

    /// The terminal port failed reading input.
    #[error("terminal read failed")]
    Read(#[source] io::Error),

    /// The terminal port failed writing output.
    #[error("terminal write failed")]
    Write(#[source] io::Error),

    /// Allocation failed growing the edit buffer or history.
    #[error("out of memory")]
    Memory,

    /// API misuse, e.g. a zero-sized fixed buffer.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
}

impl Error {
    /// Whether this is the expected end-of-input outcome.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }

    /// Whether this is the expected Ctrl-C outcome.
    #[must_use]
    pub const fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }

    /// Map a port read failure, folding stream end into [`Error::Eof`].
    pub(crate) fn from_read(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::Eof
        } else {
            Self::Read(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_flow_predicates() {
        assert!(Error::Eof.is_eof());
        assert!(Error::Interrupted.is_interrupted());
        assert!(!Error::NotTty.is_eof());
    }

    #[test]
    fn stream_end_folds_into_eof() {
        let err = Error::from_read(io::Error::new(io::ErrorKind::UnexpectedEof, "closed"));
        assert!(err.is_eof());
        let err = Error::from_read(io::Error::other("boom"));
        assert!(matches!(err, Error::Read(_)));
    }
}
