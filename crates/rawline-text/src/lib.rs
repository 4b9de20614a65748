#![forbid(unsafe_code)]

//! UTF-8 grapheme and display-width primitives for rawline.
//!
//! The editor operates on raw byte buffers and needs three things from this
//! crate:
//! - decoding codepoints at arbitrary byte offsets, forward and backward,
//!   without ever panicking on malformed input,
//! - a terminal-oriented width model (0, 1, or 2 columns per codepoint),
//! - grapheme-cluster walking, so that cursor movement and deletion treat
//!   `é`, CJK, emoji with skin tones, and ZWJ sequences as single units.
//!
//! The width tables here are deliberately *not* the `unicode-width` tables:
//! terminals render regional-indicator pairs and emoji-presentation
//! sequences as double-width glyphs, and a line editor that disagrees with
//! the terminal about column counts produces garbled redraws. The
//! differential corpus in `tests/width_corpus.rs` documents exactly where
//! the two models agree and diverge.
//!
//! # Example
//! ```
//! use rawline_text::{display_width, next_grapheme_len, prev_grapheme_len};
//!
//! let s = "caf\u{e9}"; // café
//! assert_eq!(display_width(s.as_bytes()), 4);
//!
//! // A ZWJ sequence (rainbow flag) is a single cluster.
//! let flag = "\u{1F3F3}\u{FE0F}\u{200D}\u{1F308}";
//! assert_eq!(next_grapheme_len(flag.as_bytes(), 0), flag.len());
//! assert_eq!(prev_grapheme_len(flag.as_bytes(), flag.len()), flag.len());
//! ```

pub mod codepoint;
pub mod grapheme;

pub use codepoint::{
    codepoint_width, decode_at, decode_prev, is_combining_mark, is_grapheme_extender,
    is_regional_indicator, is_skin_tone_modifier, is_variation_selector, is_zwj, leader_len,
    REPLACEMENT,
};
pub use grapheme::{cluster_width, display_width, next_grapheme_len, prev_grapheme_len};
