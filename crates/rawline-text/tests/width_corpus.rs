//! Width and segmentation corpus, checked differentially against the
//! `unicode-width` and `unicode-segmentation` crates.
//!
//! The editor's width model targets what terminals *draw*, which is not
//! identical to UAX #11. Where the two models agree, the corpus asserts
//! both. Where they intentionally diverge, the case is listed in the
//! divergence section with the reason, so a future table update cannot
//! silently change behavior in either direction.

use rawline_text::{display_width, next_grapheme_len};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Inputs on which our model and `unicode-width` agree exactly.
const AGREEING: &[(&str, usize, &str)] = &[
    ("", 0, "empty"),
    ("a", 1, "ascii letter"),
    ("hello world", 11, "ascii sentence"),
    ("{}[]()<>", 8, "ascii brackets"),
    ("caf\u{e9}", 4, "precomposed accent"),
    ("cafe\u{301}", 4, "combining accent"),
    ("e\u{300}a\u{301}o\u{302}", 3, "combining run"),
    ("\u{4E2D}\u{6587}", 4, "CJK ideographs"),
    ("\u{AC00}\u{AC01}", 4, "Hangul syllables"),
    ("\u{FF21}\u{FF22}", 4, "fullwidth latin"),
    ("\u{30A2}\u{30A4}", 4, "katakana"),
    ("\u{1F600}", 2, "emoji face"),
    ("\u{1F680}", 2, "rocket"),
    ("Hello \u{4E16}\u{754C}", 10, "mixed ascii + CJK"),
    ("\u{20000}", 2, "CJK extension B"),
];

#[test]
fn agreeing_cases_match_both_models() {
    for &(input, expected, what) in AGREEING {
        assert_eq!(
            display_width(input.as_bytes()),
            expected,
            "rawline width of {what} ({input:?})"
        );
        assert_eq!(
            input.width(),
            expected,
            "unicode-width width of {what} ({input:?})"
        );
    }
}

/// Inputs pinned to the terminal-glyph model. UAX #11-based calculators
/// have historically counted these differently, so only our value is
/// asserted here, with the rendering reason alongside.
struct Divergence {
    input: &'static str,
    ours: usize,
    what: &'static str,
}

const DIVERGING: &[Divergence] = &[
    // Terminals draw a flag as one double-width glyph; UAX #11 counts the
    // two regional indicators at one column each.
    Divergence {
        input: "\u{1F1EB}\u{1F1F7}",
        ours: 2,
        what: "regional indicator pair (flag)",
    },
    // A skin-tone modifier is part of the glyph, not a second glyph.
    Divergence {
        input: "\u{1F44B}\u{1F3FD}",
        ours: 2,
        what: "emoji + skin tone",
    },
    // ZWJ sequences collapse to the first base's glyph.
    Divergence {
        input: "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}",
        ours: 2,
        what: "family ZWJ sequence",
    },
    Divergence {
        input: "\u{1F3F3}\u{FE0F}\u{200D}\u{1F308}",
        ours: 2,
        what: "rainbow flag ZWJ sequence",
    },
];

#[test]
fn diverging_cases_follow_terminal_model() {
    for case in DIVERGING {
        assert_eq!(
            display_width(case.input.as_bytes()),
            case.ours,
            "rawline width of {} ({:?})",
            case.what,
            case.input
        );
    }
}

#[test]
fn cluster_boundaries_match_unicode_segmentation() {
    // For these inputs our walker and UAX #29 agree on every boundary.
    let inputs = [
        "hello",
        "cafe\u{301} au lait",
        "\u{4E2D}\u{6587} and ascii",
        "\u{1F44B}\u{1F3FD}ok",
        "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}!",
        "\u{1F3F3}\u{FE0F}\u{200D}\u{1F308}x",
        "\u{1F1EB}\u{1F1F7}\u{1F1E9}\u{1F1EA}", // two flags
        "e\u{300}\u{301}\u{302}",               // stacked marks
    ];
    for input in inputs {
        let bytes = input.as_bytes();
        let mut ours = Vec::new();
        let mut at = 0;
        while at < bytes.len() {
            let len = next_grapheme_len(bytes, at);
            ours.push(&input[at..at + len]);
            at += len;
        }
        let reference: Vec<&str> = input.graphemes(true).collect();
        assert_eq!(ours, reference, "cluster boundaries for {input:?}");
    }
}

#[test]
fn width_is_additive_over_clusters() {
    let input = "a\u{4E2D}\u{1F44B}\u{1F3FD}e\u{301}\u{1F1EB}\u{1F1F7}";
    let bytes = input.as_bytes();
    let mut sum = 0;
    let mut at = 0;
    while at < bytes.len() {
        let len = next_grapheme_len(bytes, at);
        sum += display_width(&bytes[at..at + len]);
        at += len;
    }
    assert_eq!(sum, display_width(bytes));
}
