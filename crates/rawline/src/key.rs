#![forbid(unsafe_code)]

//! Raw input bytes to logical key events.
//!
//! The decoder pulls bytes from the [`TerminalPort`] one at a time. The
//! first byte of an event is read blocking; every byte after it (escape
//! sequence tails, UTF-8 continuations, trailing grapheme extenders) is
//! read under a short timeout so that a lone Escape keypress or a torn
//! multi-byte sequence can never hang the editor. A partially read escape
//! sequence is discarded silently when the timeout fires.
//!
//! Printable input coalesces extenders: after a base codepoint, any
//! combining marks, variation selectors, skin tones, ZWJ joins, and the
//! second half of a regional-indicator pair that are *already buffered*
//! (a non-blocking poll, so typing never stalls) are folded into the same
//! [`Key::Insert`] event — a pasted `é` or rainbow flag lands in the
//! buffer as one cluster. A codepoint that turns out to start the next
//! cluster is carried over to the next `read_key` call, never dropped.

use std::time::Duration;

use smallvec::SmallVec;

use rawline_text::{is_grapheme_extender, is_regional_indicator, is_zwj, leader_len};

use crate::error::{Error, Result};
use crate::logging::trace;
use crate::term::TerminalPort;

/// Timeout for escape-sequence tails and cluster coalescing.
pub const DEFAULT_ESCAPE_TIMEOUT: Duration = Duration::from_millis(100);

/// Inline capacity for one cluster's bytes; bigger clusters spill to heap.
const CLUSTER_INLINE: usize = 16;

/// A logical key event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// A printable grapheme cluster, carrying its UTF-8 bytes.
    Insert(SmallVec<[u8; CLUSTER_INLINE]>),
    /// Enter / Ctrl-M.
    Enter,
    /// Backspace (DEL) or Ctrl-H.
    Backspace,
    /// Tab / Ctrl-I.
    Tab,
    /// A standalone Escape keypress.
    Esc,
    /// A control chord, e.g. `Ctrl('a')`. Always a lowercase letter.
    Ctrl(char),
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Home (`CSI H`, `SS3 H`, `CSI 1~`, `CSI 7~`).
    Home,
    /// End (`CSI F`, `SS3 F`, `CSI 4~`, `CSI 8~`).
    End,
    /// Delete (`CSI 3~`).
    Delete,
}

impl Key {
    /// Build an insert event from a string (test and completion helper).
    #[must_use]
    pub fn insert(s: &str) -> Self {
        Self::Insert(SmallVec::from_slice(s.as_bytes()))
    }
}

/// Pull-style key decoder with escape-timeout discipline.
#[derive(Debug)]
pub struct KeyDecoder {
    timeout: Duration,
    /// Bytes read ahead of their event during cluster coalescing.
    carry: SmallVec<[u8; CLUSTER_INLINE]>,
}

impl Default for KeyDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_ESCAPE_TIMEOUT)
    }
}

impl KeyDecoder {
    /// Create a decoder with the given escape/coalescing timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            carry: SmallVec::new(),
        }
    }

    /// Change the escape/coalescing timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Read one logical key event, blocking until input arrives.
    ///
    /// Unrecognized control bytes and malformed sequences are skipped; the
    /// call keeps reading until it can return a real event or fails.
    pub fn read_key<P: TerminalPort + ?Sized>(&mut self, port: &mut P) -> Result<Key> {
        loop {
            let byte = self.next_blocking(port)?;
            match byte {
                b'\r' => return Ok(Key::Enter),
                b'\t' => return Ok(Key::Tab),
                0x08 | 0x7F => return Ok(Key::Backspace),
                0x1B => {
                    if let Some(key) = self.read_escape(port)? {
                        return Ok(key);
                    }
                    // Torn or unknown sequence: discarded, keep reading.
                }
                0x01..=0x1A => {
                    let c = char::from(byte - 0x01 + b'a');
                    if matches!(
                        c,
                        'a' | 'b' | 'c' | 'd' | 'e' | 'f' | 'k' | 'l' | 'n' | 'p' | 't' | 'u' | 'w'
                    ) {
                        return Ok(Key::Ctrl(c));
                    }
                    trace!(byte, "ignoring unbound control byte");
                }
                0x00 | 0x1C..=0x1F => {
                    trace!(byte, "ignoring unbound control byte");
                }
                _ => {
                    if let Some(key) = self.read_cluster(port, byte)? {
                        return Ok(key);
                    }
                    // Malformed UTF-8 from the wire: dropped, keep reading.
                }
            }
        }
    }

    // ── Byte plumbing ────────────────────────────────────────────────────

    fn next_blocking<P: TerminalPort + ?Sized>(&mut self, port: &mut P) -> Result<u8> {
        if let Some(&b) = self.carry.first() {
            self.carry.remove(0);
            return Ok(b);
        }
        match port.read_byte(None).map_err(Error::from_read)? {
            Some(b) => Ok(b),
            // A blocking read has no timeout to report; treat it as stream end.
            None => Err(Error::Eof),
        }
    }

    fn next_timed<P: TerminalPort + ?Sized>(&mut self, port: &mut P) -> Result<Option<u8>> {
        if let Some(&b) = self.carry.first() {
            self.carry.remove(0);
            return Ok(Some(b));
        }
        port.read_byte(Some(self.timeout)).map_err(Error::from_read)
    }

    /// Non-blocking probe: only bytes already buffered. Interactive typing
    /// of a lone base character must not stall on the escape timeout.
    fn next_polled<P: TerminalPort + ?Sized>(&mut self, port: &mut P) -> Result<Option<u8>> {
        if let Some(&b) = self.carry.first() {
            self.carry.remove(0);
            return Ok(Some(b));
        }
        port.read_byte(Some(Duration::ZERO)).map_err(Error::from_read)
    }

    // ── Escape sequences ─────────────────────────────────────────────────

    /// Decode the tail of an escape sequence. `Ok(None)` means the sequence
    /// was torn or unrecognized and has been discarded.
    fn read_escape<P: TerminalPort + ?Sized>(&mut self, port: &mut P) -> Result<Option<Key>> {
        let Some(b1) = self.next_timed(port)? else {
            // Nothing followed within the timeout: a real Escape keypress.
            return Ok(Some(Key::Esc));
        };
        match b1 {
            b'[' => self.read_csi(port),
            b'O' => {
                let Some(b2) = self.next_timed(port)? else {
                    return Ok(None);
                };
                Ok(match b2 {
                    b'H' => Some(Key::Home),
                    b'F' => Some(Key::End),
                    _ => None,
                })
            }
            _ => {
                trace!(introducer = b1, "discarding unknown escape sequence");
                Ok(None)
            }
        }
    }

    fn read_csi<P: TerminalPort + ?Sized>(&mut self, port: &mut P) -> Result<Option<Key>> {
        let Some(b2) = self.next_timed(port)? else {
            return Ok(None);
        };
        if !b2.is_ascii_digit() {
            return Ok(match b2 {
                b'A' => Some(Key::Up),
                b'B' => Some(Key::Down),
                b'C' => Some(Key::Right),
                b'D' => Some(Key::Left),
                b'H' => Some(Key::Home),
                b'F' => Some(Key::End),
                _ => None,
            });
        }

        // Digit parameter sequence: collect digits until the `~` final byte.
        let mut param = usize::from(b2 - b'0');
        loop {
            let Some(b) = self.next_timed(port)? else {
                return Ok(None);
            };
            match b {
                b'0'..=b'9' => {
                    param = param.saturating_mul(10) + usize::from(b - b'0');
                }
                b'~' => {
                    return Ok(match param {
                        1 | 7 => Some(Key::Home),
                        3 => Some(Key::Delete),
                        4 | 8 => Some(Key::End),
                        _ => None,
                    });
                }
                _ => return Ok(None),
            }
        }
    }

    // ── Printable clusters ───────────────────────────────────────────────

    /// Assemble one printable grapheme cluster starting from `first`.
    ///
    /// Returns `Ok(None)` when the assembled bytes are not valid UTF-8.
    fn read_cluster<P: TerminalPort + ?Sized>(
        &mut self,
        port: &mut P,
        first: u8,
    ) -> Result<Option<Key>> {
        let mut bytes: SmallVec<[u8; CLUSTER_INLINE]> = SmallVec::new();
        let Some(base) = self.read_codepoint(port, first, &mut bytes)? else {
            return Ok(None);
        };
        let mut joined = is_zwj(base);
        let mut flag_open = is_regional_indicator(base);

        // Fold trailing extenders (and ZWJ joins) already sitting in the
        // input into the same event. Paste arrives as one burst and
        // coalesces; a typed base character alone is emitted immediately.
        loop {
            let Some(next) = self.next_polled(port)? else {
                break;
            };
            if next < 0x20 || next == 0x7F {
                // Control byte: belongs to the next event.
                self.carry.push(next);
                break;
            }
            let mark = bytes.len();
            let Some(cp) = self.read_codepoint(port, next, &mut bytes)? else {
                // Malformed continuation: drop it, emit what we have.
                bytes.truncate(mark);
                break;
            };
            if is_zwj(cp) {
                joined = true;
            } else if is_grapheme_extender(cp) {
                joined = false;
            } else if joined {
                // Base joined on by the preceding ZWJ.
                joined = false;
                flag_open = false;
            } else if flag_open && is_regional_indicator(cp) {
                flag_open = false;
            } else {
                // Start of the next cluster: carry it over.
                self.carry.extend_from_slice(&bytes[mark..]);
                bytes.truncate(mark);
                break;
            }
        }

        if std::str::from_utf8(&bytes).is_err() {
            trace!("dropping malformed input cluster");
            return Ok(None);
        }
        Ok(Some(Key::Insert(bytes)))
    }

    /// Read the continuation bytes of one codepoint whose leader is `first`
    /// and append the whole sequence to `out`. Returns the codepoint, or
    /// `None` when the sequence is torn or malformed (nothing is appended).
    fn read_codepoint<P: TerminalPort + ?Sized>(
        &mut self,
        port: &mut P,
        first: u8,
        out: &mut SmallVec<[u8; CLUSTER_INLINE]>,
    ) -> Result<Option<u32>> {
        let len = leader_len(first);
        if len == 1 {
            if first < 0x80 {
                out.push(first);
                return Ok(Some(u32::from(first)));
            }
            // Stray continuation byte or invalid leader.
            return Ok(None);
        }

        let mut seq: SmallVec<[u8; 4]> = SmallVec::new();
        seq.push(first);
        for _ in 1..len {
            let Some(b) = self.next_timed(port)? else {
                return Ok(None);
            };
            if b & 0xC0 != 0x80 {
                // Not a continuation byte: it starts something else.
                self.carry.push(b);
                return Ok(None);
            }
            seq.push(b);
        }
        let (cp, decoded) = rawline_text::decode_at(&seq, 0);
        if decoded != len {
            return Ok(None);
        }
        out.extend_from_slice(&seq);
        Ok(Some(cp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::MemoryTerminal;

    fn decode_all(input: &[u8]) -> Vec<Key> {
        let mut term = MemoryTerminal::new(80);
        term.feed_bytes(input);
        let mut decoder = KeyDecoder::default();
        let mut keys = Vec::new();
        loop {
            match decoder.read_key(&mut term) {
                Ok(key) => keys.push(key),
                Err(Error::Eof) => break,
                Err(err) => panic!("decode failed: {err}"),
            }
        }
        keys
    }

    #[test]
    fn ascii_and_controls() {
        let keys = decode_all(b"a\x01\x05\r\t\x7f\x08");
        assert_eq!(
            keys,
            vec![
                Key::insert("a"),
                Key::Ctrl('a'),
                Key::Ctrl('e'),
                Key::Enter,
                Key::Tab,
                Key::Backspace,
                Key::Backspace,
            ]
        );
    }

    #[test]
    fn arrows_home_end_delete() {
        let keys = decode_all(b"\x1b[A\x1b[B\x1b[C\x1b[D\x1b[H\x1b[F\x1b[3~\x1b[1~\x1b[4~");
        assert_eq!(
            keys,
            vec![
                Key::Up,
                Key::Down,
                Key::Right,
                Key::Left,
                Key::Home,
                Key::End,
                Key::Delete,
                Key::Home,
                Key::End,
            ]
        );
    }

    #[test]
    fn ss3_home_end() {
        let keys = decode_all(b"\x1bOH\x1bOF");
        assert_eq!(keys, vec![Key::Home, Key::End]);
    }

    #[test]
    fn lone_escape_times_out_to_escape_event() {
        // The script is exhausted after ESC, so the timed tail read reports
        // a timeout and the decoder emits a standalone Escape.
        let keys = decode_all(b"\x1b");
        assert_eq!(keys, vec![Key::Esc]);
    }

    #[test]
    fn escape_timeout_consumes_no_later_input() {
        let mut term = MemoryTerminal::new(80);
        term.feed_bytes(b"\x1b");
        let mut decoder = KeyDecoder::default();
        assert_eq!(decoder.read_key(&mut term).unwrap(), Key::Esc);
        term.feed_bytes(b"x");
        assert_eq!(decoder.read_key(&mut term).unwrap(), Key::insert("x"));
    }

    #[test]
    fn unknown_csi_discarded_silently() {
        let keys = decode_all(b"\x1b[Zq");
        assert_eq!(keys, vec![Key::insert("q")]);
    }

    #[test]
    fn utf8_cluster_assembly() {
        let keys = decode_all("é".as_bytes());
        assert_eq!(keys, vec![Key::insert("é")]);
        let keys = decode_all("中".as_bytes());
        assert_eq!(keys, vec![Key::insert("中")]);
        let keys = decode_all("🎉".as_bytes());
        assert_eq!(keys, vec![Key::insert("🎉")]);
    }

    #[test]
    fn combining_mark_coalesces_with_base() {
        let keys = decode_all("e\u{0301}x".as_bytes());
        assert_eq!(keys, vec![Key::insert("e\u{0301}"), Key::insert("x")]);
    }

    #[test]
    fn zwj_sequence_is_one_event() {
        let flag = "\u{1F3F3}\u{FE0F}\u{200D}\u{1F308}";
        let keys = decode_all(flag.as_bytes());
        assert_eq!(keys, vec![Key::insert(flag)]);
    }

    #[test]
    fn regional_pair_is_one_event() {
        let keys = decode_all("\u{1F1EB}\u{1F1F7}a".as_bytes());
        assert_eq!(
            keys,
            vec![Key::insert("\u{1F1EB}\u{1F1F7}"), Key::insert("a")]
        );
    }

    #[test]
    fn next_cluster_byte_is_carried_not_lost() {
        let keys = decode_all(b"ab\r");
        assert_eq!(
            keys,
            vec![Key::insert("a"), Key::insert("b"), Key::Enter]
        );
    }

    #[test]
    fn malformed_bytes_are_skipped() {
        // 0x80 is a stray continuation byte, 0xC3 0x28 a bad sequence.
        let keys = decode_all(&[0x80, 0xC3, 0x28, b'z']);
        assert_eq!(keys, vec![Key::insert("("), Key::insert("z")]);
    }

    #[test]
    fn torn_utf8_sequence_is_dropped() {
        // Leader for a 4-byte sequence with nothing after it.
        let keys = decode_all(&[0xF0]);
        assert_eq!(keys, vec![]);
    }
}
