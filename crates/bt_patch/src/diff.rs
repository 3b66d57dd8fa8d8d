//! Unified-diff generation.
//!
//! Used to author patches from an edited tree: the output of
//! [`unified_diff`] parses back with [`PatchDocument::parse`] and applies
//! cleanly to the old file with [`PatchEngine`].
//!
//! [`PatchDocument::parse`]: crate::PatchDocument::parse
//! [`PatchEngine`]: crate::PatchEngine

use std::fmt::Write as _;

use crate::document::NO_NEWLINE_MARKER;
use crate::source::SourceFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal(usize, usize),
    Delete(usize),
    Insert(usize),
}

/// A line plus whether it is a final line lacking its newline, so that a
/// change in the trailing newline shows up as a changed line.
type Key<'a> = (&'a str, bool);

fn keys(file: &SourceFile) -> Vec<Key<'_>> {
    let last = file.len().checked_sub(1);
    file.lines()
        .iter()
        .enumerate()
        .map(|(i, l)| (l.as_str(), Some(i) == last && !file.has_trailing_newline()))
        .collect()
}

/// Produces a unified diff from `old` to `new` with `context` lines around
/// each change, or `None` if the files are identical.
pub fn unified_diff(
    old: &SourceFile,
    new: &SourceFile,
    old_name: &str,
    new_name: &str,
    context: usize,
) -> Option<String> {
    let a = keys(old);
    let b = keys(new);
    let ops = shortest_edit(&a, &b);
    if ops.iter().all(|op| matches!(op, Op::Equal(..))) {
        return None;
    }

    // Lines of each side consumed before op `i`.
    let mut a_before = Vec::with_capacity(ops.len() + 1);
    let mut b_before = Vec::with_capacity(ops.len() + 1);
    let (mut ai, mut bi) = (0, 0);
    for op in &ops {
        a_before.push(ai);
        b_before.push(bi);
        match op {
            Op::Equal(..) => {
                ai += 1;
                bi += 1;
            }
            Op::Delete(_) => ai += 1,
            Op::Insert(_) => bi += 1,
        }
    }
    a_before.push(ai);
    b_before.push(bi);

    let mut out = format!("--- {old_name}\n+++ {new_name}\n");
    for (start, stop) in group(&ops, context) {
        let old_len = a_before[stop] - a_before[start];
        let new_len = b_before[stop] - b_before[start];
        let old_start = if old_len == 0 { a_before[start] } else { a_before[start] + 1 };
        let new_start = if new_len == 0 { b_before[start] } else { b_before[start] + 1 };
        let _ = writeln!(out, "@@ -{old_start},{old_len} +{new_start},{new_len} @@");

        for op in &ops[start..stop] {
            let (marker, (text, missing_newline)) = match *op {
                Op::Equal(i, _) => (' ', a[i]),
                Op::Delete(i) => ('-', a[i]),
                Op::Insert(j) => ('+', b[j]),
            };
            out.push(marker);
            out.push_str(text);
            out.push('\n');
            if missing_newline {
                out.push_str(NO_NEWLINE_MARKER);
                out.push('\n');
            }
        }
    }
    Some(out)
}

/// Splits the edit script into hunk ranges `[start, stop)`, merging changes
/// separated by at most `2 * context` equal lines.
fn group(ops: &[Op], context: usize) -> Vec<(usize, usize)> {
    let is_equal = |i: usize| matches!(ops[i], Op::Equal(..));
    let mut ranges = Vec::new();
    let mut i = 0;
    while i < ops.len() {
        if is_equal(i) {
            i += 1;
            continue;
        }
        let start = i.saturating_sub(context);
        let mut j = i;
        let end = loop {
            while j < ops.len() && !is_equal(j) {
                j += 1;
            }
            let mut k = j;
            while k < ops.len() && is_equal(k) {
                k += 1;
            }
            if k < ops.len() && k - j <= 2 * context {
                j = k;
            } else {
                break j;
            }
        };
        let stop = (end + context).min(ops.len());
        ranges.push((start, stop));
        i = stop;
    }
    ranges
}

/// Myers' O(ND) shortest edit script.
fn shortest_edit(a: &[Key<'_>], b: &[Key<'_>]) -> Vec<Op> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max = (n + m) as usize;
    let offset = max as isize;
    let mut v = vec![0isize; 2 * max + 2];
    let mut trace: Vec<Vec<isize>> = Vec::new();

    'search: for d in 0..=max as isize {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let idx = (k + offset) as usize;
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1]
            } else {
                v[idx - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx] = x;
            if x >= n && y >= m {
                break 'search;
            }
            k += 2;
        }
    }

    let mut ops = Vec::with_capacity(max);
    let (mut x, mut y) = (n, m);
    for (d, v) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let k = x - y;
        let idx = (k + offset) as usize;
        let prev_k = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[(prev_k + offset) as usize];
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            ops.push(Op::Equal((x - 1) as usize, (y - 1) as usize));
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            if x == prev_x {
                ops.push(Op::Insert((y - 1) as usize));
            } else {
                ops.push(Op::Delete((x - 1) as usize));
            }
        }
        x = prev_x;
        y = prev_y;
    }
    ops.reverse();
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PatchDocument, PatchEngine};

    fn diff(old: &str, new: &str) -> Option<String> {
        unified_diff(
            &SourceFile::parse(old),
            &SourceFile::parse(new),
            "a/Foo.java",
            "b/Foo.java",
            3,
        )
    }

    fn round_trip(old: &str, new: &str) {
        let text = diff(old, new).expect("files differ");
        let doc = PatchDocument::parse(&text).unwrap();
        let applied = PatchEngine::default()
            .apply(&SourceFile::parse(old), &doc)
            .unwrap();
        assert_eq!(applied.file.render(), new, "patch:\n{text}");
        assert!(applied.is_exact(), "patch:\n{text}");
    }

    #[test]
    fn identical_files_have_no_diff() {
        assert!(diff("a\nb\n", "a\nb\n").is_none());
        assert!(diff("", "").is_none());
    }

    #[test]
    fn single_line_change() {
        let text = diff("a\nb\nc\n", "a\nB\nc\n").unwrap();
        assert_eq!(
            text,
            "--- a/Foo.java\n+++ b/Foo.java\n@@ -1,3 +1,3 @@\n a\n-b\n+B\n c\n"
        );
    }

    #[test]
    fn context_is_limited() {
        let old: String = (1..=20).map(|i| format!("{i}\n")).collect();
        let new = old.replace("10\n", "ten\n");
        let text = diff(&old, &new).unwrap();
        assert!(text.contains("@@ -7,7 +7,7 @@"), "{text}");
        assert!(!text.contains(" 6\n"));
        assert!(!text.contains(" 14\n"));
    }

    #[test]
    fn distant_changes_make_separate_hunks() {
        let old: String = (1..=30).map(|i| format!("{i}\n")).collect();
        let new: String = (1..=30)
            .map(|i| match i {
                3 => "three\n".to_string(),
                27 => "twenty-seven\n".to_string(),
                _ => format!("{i}\n"),
            })
            .collect();
        let text = diff(&old, &new).unwrap();
        assert_eq!(text.matches("@@ -").count(), 2, "{text}");
        round_trip(&old, &new);
    }

    #[test]
    fn nearby_changes_share_a_hunk() {
        let old: String = (1..=30).map(|i| format!("{i}\n")).collect();
        let new = old.replace("10\n", "ten\n").replace("15\n", "fifteen\n");
        let text = diff(&old, &new).unwrap();
        assert_eq!(text.matches("@@ -").count(), 1, "{text}");
    }

    #[test]
    fn round_trips() {
        round_trip("a\nb\nc\n", "a\nc\n");
        round_trip("a\nb\nc\n", "x\na\nb\nc\ny\n");
        round_trip("", "new\nfile\n");
        round_trip("old\nfile\n", "");
        round_trip(
            "class A {\n    int x;\n}\n",
            "class A {\n    int x;\n    int y;\n}\n",
        );
    }

    #[test]
    fn trailing_newline_changes_round_trip() {
        round_trip("a\nb", "a\nb\n");
        round_trip("a\nb\n", "a\nb");
        round_trip("a\nb", "a\nc");
    }

    #[test]
    fn missing_newline_marker_emitted() {
        let text = diff("a\nb\n", "a\nb").unwrap();
        assert!(text.ends_with("+b\n\\ No newline at end of file\n"), "{text}");
    }

    #[test]
    fn insertion_header_uses_preceding_line() {
        let text = diff("", "x\n").unwrap();
        assert!(text.contains("@@ -0,0 +1,1 @@"), "{text}");
    }
}
