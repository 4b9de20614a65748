//! Property-based invariants for the edit buffer.
//!
//! For **any** sequence of editing operations:
//! 1. The buffer stays well-formed UTF-8 (guaranteed by construction, but
//!    asserted anyway as the contract).
//! 2. The cursor always sits on a grapheme-cluster boundary.
//! 3. Inserting a cluster then backspacing is the identity.
//! 4. A single left/right step moves the cursor by exactly one cluster.

use proptest::prelude::*;
use rawline::{Capacity, LineBuffer};
use rawline_text::next_grapheme_len;

/// Clusters spanning the interesting width/byte-length classes.
const CLUSTERS: &[&str] = &[
    "a",
    "Z",
    " ",
    "é",
    "ß",
    "中",
    "한",
    "🎉",
    "👋🏽",
    "e\u{0301}",
    "\u{1F3F3}\u{FE0F}\u{200D}\u{1F308}",
    "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}",
    "\u{1F1EB}\u{1F1F7}",
];

#[derive(Debug, Clone)]
enum Op {
    Insert(&'static str),
    Backspace,
    DeleteForward,
    Left,
    Right,
    Home,
    End,
    DeletePrevWord,
    KillToEnd,
    KillLine,
    Transpose,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => proptest::sample::select(CLUSTERS).prop_map(Op::Insert),
        2 => Just(Op::Backspace),
        1 => Just(Op::DeleteForward),
        2 => Just(Op::Left),
        2 => Just(Op::Right),
        1 => Just(Op::Home),
        1 => Just(Op::End),
        1 => Just(Op::DeletePrevWord),
        1 => Just(Op::KillToEnd),
        1 => Just(Op::KillLine),
        1 => Just(Op::Transpose),
    ]
}

fn apply(buf: &mut LineBuffer, op: &Op) {
    match op {
        Op::Insert(s) => {
            buf.insert(s).unwrap();
        }
        Op::Backspace => {
            buf.backspace();
        }
        Op::DeleteForward => {
            buf.delete_forward();
        }
        Op::Left => {
            buf.move_left();
        }
        Op::Right => {
            buf.move_right();
        }
        Op::Home => {
            buf.move_home();
        }
        Op::End => {
            buf.move_end();
        }
        Op::DeletePrevWord => {
            buf.delete_prev_word();
        }
        Op::KillToEnd => {
            buf.kill_to_end();
        }
        Op::KillLine => {
            buf.kill_line();
        }
        Op::Transpose => {
            buf.transpose();
        }
    }
}

/// All cluster boundaries of the buffer, including 0 and len.
fn boundaries(text: &str) -> Vec<usize> {
    let bytes = text.as_bytes();
    let mut out = vec![0];
    let mut at = 0;
    while at < bytes.len() {
        let step = next_grapheme_len(bytes, at);
        assert!(step > 0, "walker stuck at {at} in {text:?}");
        at += step;
        out.push(at);
    }
    out
}

proptest! {
    #[test]
    fn cursor_stays_on_cluster_boundaries(ops in proptest::collection::vec(op_strategy(), 0..60)) {
        let mut buf = LineBuffer::new(Capacity::Dynamic).unwrap();
        for op in &ops {
            apply(&mut buf, op);
            // Well-formed UTF-8: as_str would have panicked otherwise, but
            // assert the contract explicitly.
            prop_assert!(std::str::from_utf8(buf.as_str().as_bytes()).is_ok());
            let bounds = boundaries(buf.as_str());
            prop_assert!(
                bounds.contains(&buf.pos()),
                "cursor {} off-boundary in {:?} (bounds {:?}) after {:?}",
                buf.pos(),
                buf.as_str(),
                bounds,
                op
            );
        }
    }

    #[test]
    fn backspace_inverts_insert(
        ops in proptest::collection::vec(op_strategy(), 0..30),
        cluster in proptest::sample::select(CLUSTERS),
    ) {
        let mut buf = LineBuffer::new(Capacity::Dynamic).unwrap();
        for op in &ops {
            apply(&mut buf, op);
        }
        let before_text = buf.as_str().to_string();
        let before_pos = buf.pos();

        buf.insert(cluster).unwrap();
        prop_assert_eq!(buf.len(), before_text.len() + cluster.len());
        // The freshly inserted cluster may join with what precedes the
        // cursor (e.g. a combining mark after a base); backspace is only
        // its exact inverse when the insert formed its own cluster.
        let bounds = boundaries(buf.as_str());
        if bounds.contains(&before_pos) {
            buf.backspace();
            prop_assert_eq!(buf.as_str(), &before_text);
            prop_assert_eq!(buf.pos(), before_pos);
        }
    }

    #[test]
    fn single_step_moves_one_cluster(ops in proptest::collection::vec(op_strategy(), 0..40)) {
        let mut buf = LineBuffer::new(Capacity::Dynamic).unwrap();
        for op in &ops {
            apply(&mut buf, op);
        }
        let bounds = boundaries(buf.as_str());
        let here = buf.pos();
        let idx = bounds.iter().position(|&b| b == here).expect("on boundary");

        let moved = buf.move_left();
        if idx == 0 {
            prop_assert!(!moved);
            prop_assert_eq!(buf.pos(), 0);
        } else {
            prop_assert!(moved);
            prop_assert_eq!(buf.pos(), bounds[idx - 1]);
            let back = buf.move_right();
            prop_assert!(back);
            prop_assert_eq!(buf.pos(), here);
        }
    }

    #[test]
    fn fixed_capacity_never_exceeded(ops in proptest::collection::vec(op_strategy(), 0..60)) {
        let mut buf = LineBuffer::new(Capacity::Fixed(16)).unwrap();
        for op in &ops {
            apply(&mut buf, op);
            prop_assert!(buf.len() <= 15, "len {} over capacity", buf.len());
            prop_assert!(buf.pos() <= buf.len());
        }
    }
}
