#![forbid(unsafe_code)]

//! The edit buffer: one line of UTF-8 text plus a cursor.
//!
//! The cursor is a byte offset and is kept on a grapheme-cluster boundary
//! by every operation, so `é`, CJK ideographs, emoji with skin tones, and
//! ZWJ sequences move and delete as single units. The buffer is either
//! bounded ([`Capacity::Fixed`]; inserts that would overflow are dropped
//! silently) or growable ([`Capacity::Dynamic`]; allocation failure
//! surfaces as [`Error::Memory`] with the buffer left untouched).

use rawline_text::{display_width, next_grapheme_len, prev_grapheme_len};

use crate::error::{Error, Result};

/// Growth policy for a [`LineBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    /// At most `n - 1` content bytes (one slot is reserved, mirroring the
    /// classic terminator convention callers size their buffers for).
    Fixed(usize),
    /// Grow on demand.
    Dynamic,
}

impl Capacity {
    fn max_bytes(self) -> usize {
        match self {
            Self::Fixed(n) => n.saturating_sub(1),
            Self::Dynamic => usize::MAX,
        }
    }
}

/// One line of text being edited.
#[derive(Debug, Clone)]
pub struct LineBuffer {
    text: String,
    pos: usize,
    capacity: Capacity,
}

impl LineBuffer {
    /// Create an empty buffer. Fails with [`Error::Invalid`] on a
    /// zero-sized fixed capacity.
    pub fn new(capacity: Capacity) -> Result<Self> {
        if matches!(capacity, Capacity::Fixed(0)) {
            return Err(Error::Invalid("zero-sized edit buffer"));
        }
        Ok(Self {
            text: String::new(),
            pos: 0,
            capacity,
        })
    }

    /// The buffer contents.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Cursor position as a byte offset (always a cluster boundary).
    #[must_use]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Content length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Display width of the bytes before the cursor.
    #[must_use]
    pub fn width_to_cursor(&self) -> usize {
        display_width(&self.text.as_bytes()[..self.pos])
    }

    /// Display width of the whole content.
    #[must_use]
    pub fn width(&self) -> usize {
        display_width(self.text.as_bytes())
    }

    /// Replace the contents (history recall, completion accept), truncating
    /// at a cluster boundary to fit the capacity. Cursor moves to the end.
    pub fn set_text(&mut self, text: &str) {
        let max = self.capacity.max_bytes();
        let mut end = 0;
        let bytes = text.as_bytes();
        while end < bytes.len() {
            let clen = next_grapheme_len(bytes, end);
            if clen == 0 || end + clen > max {
                break;
            }
            end += clen;
        }
        self.text.clear();
        self.text.push_str(&text[..end]);
        self.pos = self.text.len();
    }

    /// Insert a cluster (or any string) at the cursor.
    ///
    /// Returns `Ok(true)` when the text went in, `Ok(false)` when a fixed
    /// buffer was full and the insert was dropped.
    pub fn insert(&mut self, s: &str) -> Result<bool> {
        if self.text.len() + s.len() > self.capacity.max_bytes() {
            return Ok(false);
        }
        self.text.try_reserve(s.len()).map_err(|_| Error::Memory)?;
        self.text.insert_str(self.pos, s);
        self.pos += s.len();
        Ok(true)
    }

    /// Whether the cursor sits at the end of the content.
    #[must_use]
    pub fn at_end(&self) -> bool {
        self.pos == self.text.len()
    }

    /// Delete the cluster before the cursor. Returns whether anything changed.
    pub fn backspace(&mut self) -> bool {
        let clen = prev_grapheme_len(self.text.as_bytes(), self.pos);
        if clen == 0 {
            return false;
        }
        self.text.drain(self.pos - clen..self.pos);
        self.pos -= clen;
        true
    }

    /// Delete the cluster under the cursor (the Delete key).
    pub fn delete_forward(&mut self) -> bool {
        let clen = next_grapheme_len(self.text.as_bytes(), self.pos);
        if clen == 0 {
            return false;
        }
        self.text.drain(self.pos..self.pos + clen);
        true
    }

    /// Move the cursor one cluster left. Returns whether it moved.
    pub fn move_left(&mut self) -> bool {
        let clen = prev_grapheme_len(self.text.as_bytes(), self.pos);
        self.pos -= clen;
        clen != 0
    }

    /// Move the cursor one cluster right. Returns whether it moved.
    pub fn move_right(&mut self) -> bool {
        let clen = next_grapheme_len(self.text.as_bytes(), self.pos);
        self.pos += clen;
        clen != 0
    }

    /// Move the cursor to the start of the line.
    pub fn move_home(&mut self) -> bool {
        let moved = self.pos != 0;
        self.pos = 0;
        moved
    }

    /// Move the cursor to the end of the line.
    pub fn move_end(&mut self) -> bool {
        let moved = self.pos != self.text.len();
        self.pos = self.text.len();
        moved
    }

    /// Delete from the cursor to the end of the line (Ctrl-K).
    pub fn kill_to_end(&mut self) -> bool {
        let changed = self.pos != self.text.len();
        self.text.truncate(self.pos);
        changed
    }

    /// Delete the whole line (Ctrl-U).
    pub fn kill_line(&mut self) -> bool {
        let changed = !self.text.is_empty();
        self.text.clear();
        self.pos = 0;
        changed
    }

    /// Delete the word before the cursor (Ctrl-W): skip ASCII spaces, then
    /// the non-space run, cluster by cluster.
    pub fn delete_prev_word(&mut self) -> bool {
        let bytes = self.text.as_bytes();
        let mut start = self.pos;
        while start > 0 && bytes[start - 1] == b' ' {
            start -= prev_grapheme_len(bytes, start);
        }
        while start > 0 && bytes[start - 1] != b' ' {
            start -= prev_grapheme_len(bytes, start);
        }
        if start == self.pos {
            return false;
        }
        self.text.drain(start..self.pos);
        self.pos = start;
        true
    }

    /// Swap the cluster before the cursor with the one under it (Ctrl-T).
    ///
    /// At end of line the two clusters before the cursor are swapped and
    /// the cursor stays at the end. Returns whether anything changed.
    pub fn transpose(&mut self) -> bool {
        let bytes = self.text.as_bytes();
        let (first_start, split) = if self.pos == self.text.len() {
            let second = prev_grapheme_len(bytes, self.pos);
            if second == 0 {
                return false;
            }
            let split = self.pos - second;
            let first = prev_grapheme_len(bytes, split);
            if first == 0 {
                return false;
            }
            (split - first, split)
        } else {
            let first = prev_grapheme_len(bytes, self.pos);
            if first == 0 {
                return false;
            }
            (self.pos - first, self.pos)
        };
        let second_len = next_grapheme_len(bytes, split);
        if second_len == 0 {
            return false;
        }

        let mut swapped = String::with_capacity(split + second_len - first_start);
        swapped.push_str(&self.text[split..split + second_len]);
        swapped.push_str(&self.text[first_start..split]);
        self.text
            .replace_range(first_start..split + second_len, &swapped);

        // Cursor advances past the swapped pair (it is already there when
        // the swap happened behind an end-of-line cursor).
        if self.pos < self.text.len() {
            self.pos += second_len;
        }
        true
    }
}
