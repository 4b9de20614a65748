#![forbid(unsafe_code)]

//! Line rendering: single-line with horizontal scrolling, multi-line with
//! cursor-row tracking.
//!
//! All positioning is in display columns, never bytes. Each refresh builds
//! one [`Frame`] and issues a single write; write failures are swallowed
//! (the screen may lag but the edit state stays consistent and the next
//! refresh repairs the display).
//!
//! The split between cleaning the old frame and writing the new one is a
//! flag set so `hide` can erase without redrawing and `show` can redraw
//! without erasing.

use bitflags::bitflags;

use rawline_text::{cluster_width, display_width, next_grapheme_len, prev_grapheme_len};

use crate::editor::{HighlightFn, HintsFn};
use crate::frame::Frame;
use crate::term::TerminalPort;

bitflags! {
    /// What a refresh should do to the screen.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct Refresh: u8 {
        /// Erase the previously rendered prompt and line.
        const CLEAN = 1 << 0;
        /// Draw the current prompt and line.
        const WRITE = 1 << 1;
        /// Both.
        const ALL = Self::CLEAN.bits() | Self::WRITE.bits();
    }
}

/// Geometry remembered between refreshes for the multi-line renderer.
#[derive(Debug, Clone)]
pub(crate) struct Geometry {
    /// Cursor byte offset at the previous refresh.
    pub(crate) oldpos: usize,
    /// Rows the previous frame occupied.
    pub(crate) oldrows: usize,
    /// Cursor row within the previous frame, 1-based from the top.
    pub(crate) oldrpos: usize,
}

impl Geometry {
    pub(crate) fn new() -> Self {
        Self {
            oldpos: 0,
            oldrows: 0,
            oldrpos: 1,
        }
    }
}

/// Everything one refresh needs to draw.
pub(crate) struct View<'a> {
    pub(crate) prompt: &'a str,
    pub(crate) buf: &'a str,
    /// Cursor byte offset into `buf`.
    pub(crate) pos: usize,
    pub(crate) cols: usize,
    pub(crate) mask: bool,
    pub(crate) hints: Option<&'a HintsFn>,
    pub(crate) highlight: Option<&'a HighlightFn>,
}

/// Refresh the line in the configured mode.
pub(crate) fn refresh<P: TerminalPort + ?Sized>(
    port: &mut P,
    view: &View<'_>,
    geom: &mut Geometry,
    multiline: bool,
    flags: Refresh,
) {
    if multiline {
        refresh_multi_line(port, view, geom, flags);
    } else {
        refresh_single_line(port, view, flags);
    }
}

// ── Single line ──────────────────────────────────────────────────────────

fn refresh_single_line<P: TerminalPort + ?Sized>(port: &mut P, view: &View<'_>, flags: Refresh) {
    let pwidth = display_width(view.prompt.as_bytes());
    let bytes = view.buf.as_bytes();
    let cols = view.cols.max(1);

    // Shadow window over the buffer; the buffer itself is never mutated.
    let mut start = 0;
    let mut end = bytes.len();
    let mut poscol = display_width(&bytes[..view.pos]);
    let mut lencol = display_width(bytes);

    // Scroll clusters off the left edge until the cursor fits.
    while pwidth + poscol >= cols {
        let clen = next_grapheme_len(bytes, start);
        if clen == 0 {
            break;
        }
        let cwidth = cluster_width(&bytes[start..start + clen]);
        start += clen;
        poscol = poscol.saturating_sub(cwidth);
        lencol = lencol.saturating_sub(cwidth);
    }

    // Trim clusters off the right edge until the line fits.
    while pwidth + lencol > cols {
        let clen = prev_grapheme_len(&bytes[start..end], end - start);
        if clen == 0 {
            break;
        }
        let cwidth = cluster_width(&bytes[end - clen..end]);
        end -= clen;
        lencol = lencol.saturating_sub(cwidth);
    }

    let mut frame = Frame::new();
    frame.carriage_return();

    if flags.contains(Refresh::WRITE) {
        frame.push_str(view.prompt);
        push_content(&mut frame, view, start, end);
        push_hint(&mut frame, view, pwidth);
    }

    frame.erase_to_right();

    if flags.contains(Refresh::WRITE) {
        frame.carriage_return();
        frame.cursor_right(pwidth + poscol);
    }

    let _ = port.write(frame.as_bytes());
}

// ── Multi line ───────────────────────────────────────────────────────────

fn refresh_multi_line<P: TerminalPort + ?Sized>(
    port: &mut P,
    view: &View<'_>,
    geom: &mut Geometry,
    flags: Refresh,
) {
    let cols = view.cols.max(1);
    let pwidth = display_width(view.prompt.as_bytes());
    let bufwidth = display_width(view.buf.as_bytes());
    let poswidth = display_width(&view.buf.as_bytes()[..view.pos]);

    let mut rows = (pwidth + bufwidth).div_ceil(cols);
    let rpos = geom.oldrpos;
    let old_rows = geom.oldrows;
    geom.oldrows = rows;

    let mut frame = Frame::new();

    if flags.contains(Refresh::CLEAN) {
        // Go down to the last row of the previous frame, then clear each
        // row on the way back up.
        if old_rows > rpos {
            frame.cursor_down(old_rows - rpos);
        }
        for _ in 1..old_rows {
            frame.carriage_return();
            frame.erase_to_right();
            frame.cursor_up(1);
        }
    }

    if flags.intersects(Refresh::ALL) {
        // Clear the top row.
        frame.carriage_return();
        frame.erase_to_right();
    }

    if flags.contains(Refresh::WRITE) {
        frame.push_str(view.prompt);
        push_content(&mut frame, view, 0, view.buf.len());
        push_hint(&mut frame, view, pwidth);

        // Cursor at the exact end of a row: reserve an empty continuation
        // row so the cursor has somewhere to sit.
        if view.pos > 0 && view.pos == view.buf.len() && (poswidth + pwidth) % cols == 0 {
            frame.newline();
            frame.carriage_return();
            rows += 1;
            if rows > geom.oldrows {
                geom.oldrows = rows;
            }
        }

        // Move the cursor to its row and column.
        let rpos2 = (pwidth + poswidth + cols) / cols;
        if rows > rpos2 {
            frame.cursor_up(rows - rpos2);
        }
        frame.carriage_return();
        frame.cursor_right((pwidth + poswidth) % cols);

        geom.oldrpos = rpos2;
    }

    geom.oldpos = view.pos;

    let _ = port.write(frame.as_bytes());
}

// ── Shared pieces ────────────────────────────────────────────────────────

/// Emit the visible byte range of the buffer: masked, highlighted, or raw.
fn push_content(frame: &mut Frame, view: &View<'_>, start: usize, end: usize) {
    let bytes = view.buf.as_bytes();
    if view.mask {
        // One star per cluster; none of the source bytes reach the frame.
        let mut at = start;
        while at < end {
            let clen = next_grapheme_len(bytes, at);
            if clen == 0 {
                break;
            }
            frame.push_bytes(b"*");
            at += clen;
        }
        return;
    }

    if let Some(highlight) = view.highlight {
        let mut codes = vec![0u8; view.buf.len()];
        highlight(view.buf, &mut codes);
        push_highlighted(frame, &view.buf[start..end], &codes[start..end]);
        return;
    }

    frame.push_str(&view.buf[start..end]);
}

/// Emit text with per-byte color codes grouped into SGR runs.
fn push_highlighted(frame: &mut Frame, text: &str, codes: &[u8]) {
    let mut at = 0;
    while at < text.len() {
        let code = codes[at];
        let mut run_end = at + 1;
        while run_end < text.len() && codes[run_end] == code {
            run_end += 1;
        }
        // A sloppy callback may change codes inside a multi-byte sequence;
        // keep the run on a char boundary rather than panicking.
        while run_end < text.len() && !text.is_char_boundary(run_end) {
            run_end += 1;
        }
        if code == 0 {
            frame.push_str(&text[at..run_end]);
        } else {
            frame.sgr(code & 7, code & 8 != 0);
            frame.push_str(&text[at..run_end]);
            frame.sgr_reset();
        }
        at = run_end;
    }
}

/// Append the hint, when one applies and columns remain.
///
/// The hint is truncated greedily at the last cluster that fully fits; a
/// wide cluster that would straddle the right edge is dropped entirely.
fn push_hint(frame: &mut Frame, view: &View<'_>, pwidth: usize) {
    let Some(hints) = view.hints else {
        return;
    };
    let bufwidth = display_width(view.buf.as_bytes());
    if pwidth + bufwidth >= view.cols {
        return;
    }
    let Some(hint) = hints(view.buf) else {
        return;
    };

    let max_width = view.cols - (pwidth + bufwidth);
    let bytes = hint.text.as_bytes();
    let mut end = 0;
    let mut used = 0;
    while end < bytes.len() {
        let clen = next_grapheme_len(bytes, end);
        if clen == 0 {
            break;
        }
        let cwidth = cluster_width(&bytes[end..end + clen]);
        if used + cwidth > max_width {
            break;
        }
        used += cwidth;
        end += clen;
    }

    let styled = hint.color != 0 || hint.bold;
    if styled {
        // Bold with no color picks white, matching the classic behavior.
        let color = if hint.color == 0 { 7 } else { hint.color };
        frame.sgr(color, hint.bold);
    }
    frame.push_str(&hint.text[..end]);
    if styled {
        frame.sgr_reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::Hint;
    use crate::term::MemoryTerminal;

    fn view<'a>(prompt: &'a str, buf: &'a str, pos: usize, cols: usize) -> View<'a> {
        View {
            prompt,
            buf,
            pos,
            cols,
            mask: false,
            hints: None,
            highlight: None,
        }
    }

    fn render_single(view: &View<'_>) -> Vec<u8> {
        let mut term = MemoryTerminal::new(view.cols as u16);
        refresh_single_line(&mut term, view, Refresh::ALL);
        term.take_output()
    }

    #[test]
    fn simple_line_positions_cursor_by_display_column() {
        let out = render_single(&view("hello> ", "hello", 5, 60));
        assert_eq!(out, b"\rhello> hello\x1b[0K\r\x1b[12C");
    }

    #[test]
    fn wide_cluster_counts_two_columns() {
        let buf = "a\u{4E2D}";
        let out = render_single(&view("> ", buf, buf.len(), 60));
        // Prompt is 2 wide, "a" 1, the ideograph 2: cursor lands at column 5.
        assert!(out.ends_with(b"\x1b[5C"), "got {:?}", String::from_utf8_lossy(&out));
    }

    #[test]
    fn long_line_scrolls_left() {
        let buf = "a".repeat(70);
        let out = render_single(&view("hello> ", &buf, 70, 60));
        let text = String::from_utf8(out).unwrap();
        // The visible slice plus the prompt fits the width, cursor at the
        // right edge.
        assert!(text.contains(&"a".repeat(52)));
        assert!(!text.contains(&"a".repeat(53)));
        assert!(text.ends_with("\x1b[59C"));
    }

    #[test]
    fn cursor_at_home_shows_line_start() {
        let buf = "a".repeat(70);
        let out = render_single(&view("hello> ", &buf, 0, 60));
        let text = String::from_utf8(out).unwrap();
        // No scrolling needed for the cursor; the tail is trimmed instead.
        assert!(text.contains("hello> "));
        assert!(text.contains(&"a".repeat(53)));
        assert!(text.ends_with("\x1b[7C"));
    }

    #[test]
    fn clean_only_erases_without_redraw() {
        let v = view("> ", "secret", 6, 60);
        let mut term = MemoryTerminal::new(60);
        refresh_single_line(&mut term, &v, Refresh::CLEAN);
        assert_eq!(term.output(), b"\r\x1b[0K");
    }

    #[test]
    fn mask_mode_hides_bytes() {
        let mut v = view("> ", "pässwörd", 0, 60);
        v.mask = true;
        let out = render_single(&v);
        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains('p'));
        assert_eq!(text.matches('*').count(), 8);
    }

    #[test]
    fn mask_mode_counts_clusters_not_bytes() {
        let mut v = view("> ", "\u{1F3F3}\u{FE0F}\u{200D}\u{1F308}x", 0, 60);
        v.mask = true;
        let out = render_single(&v);
        assert_eq!(String::from_utf8(out).unwrap().matches('*').count(), 2);
    }

    #[test]
    fn hint_appends_after_buffer() {
        let hints: Box<HintsFn> = Box::new(|_| {
            Some(Hint {
                text: " world".into(),
                color: 0,
                bold: false,
            })
        });
        let mut v = view("> ", "hello", 5, 60);
        v.hints = Some(&*hints);
        let out = render_single(&v);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("hello world"));
        // Cursor still sits right after the typed text.
        assert!(text.ends_with("\x1b[7C"));
    }

    #[test]
    fn hint_truncates_at_last_fitting_cluster() {
        let hints: Box<HintsFn> = Box::new(|_| {
            Some(Hint {
                text: "x\u{4E2D}y".into(),
                color: 0,
                bold: false,
            })
        });
        // 10 columns, prompt 2 + buffer 6 leaves 2: "x" fits, the wide
        // ideograph would straddle the edge and is dropped along with the
        // rest.
        let mut v = view("> ", "abcdef", 6, 10);
        v.hints = Some(&*hints);
        let out = render_single(&v);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("abcdefx"));
        assert!(!text.contains('\u{4E2D}'));
        assert!(!text.contains('y'));
    }

    #[test]
    fn hint_skipped_when_no_room() {
        let hints: Box<HintsFn> = Box::new(|_| {
            Some(Hint {
                text: "nope".into(),
                color: 0,
                bold: false,
            })
        });
        let mut v = view("> ", "abcdefgh", 8, 10);
        v.hints = Some(&*hints);
        let out = render_single(&v);
        assert!(!String::from_utf8(out).unwrap().contains("nope"));
    }

    #[test]
    fn styled_hint_wraps_in_sgr() {
        let hints: Box<HintsFn> = Box::new(|_| {
            Some(Hint {
                text: "hi".into(),
                color: 5,
                bold: false,
            })
        });
        let mut v = view("> ", "x", 1, 60);
        v.hints = Some(&*hints);
        let out = render_single(&v);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\x1b[0;35;49mhi\x1b[0m"));
    }

    #[test]
    fn highlight_groups_runs() {
        let highlight: Box<HighlightFn> = Box::new(|buf, codes| {
            for (i, b) in buf.bytes().enumerate() {
                if b.is_ascii_digit() {
                    codes[i] = 2; // green
                }
            }
        });
        let mut v = view("> ", "ab12cd", 6, 60);
        v.highlight = Some(&*highlight);
        let out = render_single(&v);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("ab\x1b[0;32;49m12\x1b[0mcd"));
    }

    #[test]
    fn multiline_first_render_wraps_rows() {
        let mut term = MemoryTerminal::new(10);
        let mut geom = Geometry::new();
        let buf = "abcdefghij"; // prompt 2 + 10 = 12 → 2 rows
        let v = view("> ", buf, buf.len(), 10);
        refresh_multi_line(&mut term, &v, &mut geom, Refresh::ALL);
        assert_eq!(geom.oldrows, 2);
        assert_eq!(geom.oldrpos, 2);
        let text = String::from_utf8(term.take_output()).unwrap();
        assert!(text.contains("> abcdefghij"));
        // Cursor ends on row 2, column 2.
        assert!(text.ends_with("\r\x1b[2C"));
    }

    #[test]
    fn multiline_reserves_row_at_exact_wrap() {
        let mut term = MemoryTerminal::new(10);
        let mut geom = Geometry::new();
        let buf = "abcdefgh"; // prompt 2 + 8 = 10 → cursor exactly at wrap
        let v = view("> ", buf, buf.len(), 10);
        refresh_multi_line(&mut term, &v, &mut geom, Refresh::ALL);
        let text = String::from_utf8(term.take_output()).unwrap();
        assert!(text.contains('\n'));
        assert_eq!(geom.oldrows, 2);
    }

    #[test]
    fn multiline_clean_erases_previous_rows() {
        let mut term = MemoryTerminal::new(10);
        let mut geom = Geometry::new();
        let buf = "abcdefghijklm"; // 2 rows
        let v = view("> ", buf, buf.len(), 10);
        refresh_multi_line(&mut term, &v, &mut geom, Refresh::ALL);
        term.take_output();

        // Hide: cursor is on row 2 of 2, so no down-move, one clear+up.
        refresh_multi_line(&mut term, &v, &mut geom, Refresh::CLEAN);
        let text = String::from_utf8(term.take_output()).unwrap();
        assert_eq!(text, "\r\x1b[0K\x1b[1A\r\x1b[0K");
    }
}
