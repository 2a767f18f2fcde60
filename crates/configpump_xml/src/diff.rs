//! Line-level diff counters between two configuration documents.
//!
//! The matcher reproduces the classic Ratcliff/Obershelp "gestalt" block
//! matching used by Python's `difflib.SequenceMatcher` (no junk predicate,
//! auto-junk heuristic enabled), so counts are stable across tooling that
//! relies on those opcodes.

use crate::normalize::normalize;
use std::collections::HashMap;
use std::hash::Hash;

/// Added/removed/changed line counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// Lines present only in the new document.
    pub added: usize,
    /// Lines present only in the current document.
    pub removed: usize,
    /// Lines replaced one-for-one.
    pub changed: usize,
}

impl DiffResult {
    /// Returns true if the documents are line-identical.
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.changed == 0
    }
}

/// Computes line counters between two documents after normalizing both.
///
/// When `ignore_line_whitespace` is set, leading and trailing whitespace of
/// every line is ignored, so indentation-only changes do not count.
pub fn diff(current: &str, new: &str, ignore_line_whitespace: bool) -> DiffResult {
    let (current_norm, current_ok) = normalize(current);
    let (new_norm, new_ok) = normalize(new);

    if !current_ok && !new_ok {
        return DiffResult::default();
    }
    if current_norm.is_empty() {
        return DiffResult {
            added: split_lines(&new_norm).len(),
            ..DiffResult::default()
        };
    }
    if new_norm.is_empty() {
        return DiffResult {
            removed: split_lines(&current_norm).len(),
            ..DiffResult::default()
        };
    }

    let prepare = |text: &str| -> Vec<String> {
        split_lines(text)
            .into_iter()
            .map(|line| {
                if ignore_line_whitespace {
                    line.trim().to_string()
                } else {
                    line.to_string()
                }
            })
            .collect()
    };
    let current_lines = prepare(&current_norm);
    let new_lines = prepare(&new_norm);

    let mut result = DiffResult::default();
    for op in SequenceMatcher::new(&current_lines, &new_lines).opcodes() {
        let removed = op.a_end - op.a_start;
        let added = op.b_end - op.b_start;
        match op.tag {
            OpTag::Equal => {}
            OpTag::Insert => result.added += added,
            OpTag::Delete => result.removed += removed,
            OpTag::Replace => {
                result.changed += removed.min(added);
                if added > removed {
                    result.added += added - removed;
                } else {
                    result.removed += removed - added;
                }
            }
        }
    }
    result
}

/// Splits text on the same line boundaries as Python's `str.splitlines`.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((index, c)) = chars.next() {
        let boundary = matches!(
            c,
            '\n' | '\r'
                | '\u{0b}'
                | '\u{0c}'
                | '\u{1c}'
                | '\u{1d}'
                | '\u{1e}'
                | '\u{85}'
                | '\u{2028}'
                | '\u{2029}'
        );
        if !boundary {
            continue;
        }
        lines.push(&text[start..index]);
        let mut next = index + c.len_utf8();
        if c == '\r' {
            if let Some(&(_, '\n')) = chars.peek() {
                chars.next();
                next += 1;
            }
        }
        start = next;
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

/// Kind of an edit operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpTag {
    /// `a[a_start..a_end] == b[b_start..b_end]`.
    Equal,
    /// `a[a_start..a_end]` should be replaced by `b[b_start..b_end]`.
    Replace,
    /// `a[a_start..a_end]` should be deleted.
    Delete,
    /// `b[b_start..b_end]` should be inserted at `a_start`.
    Insert,
}

/// One edit operation over index ranges of both sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    /// Operation kind.
    pub tag: OpTag,
    /// Start in the first sequence.
    pub a_start: usize,
    /// End in the first sequence.
    pub a_end: usize,
    /// Start in the second sequence.
    pub b_start: usize,
    /// End in the second sequence.
    pub b_end: usize,
}

/// A matching block: `a[a..a + size] == b[b..b + size]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Match {
    /// Start in the first sequence.
    pub a: usize,
    /// Start in the second sequence.
    pub b: usize,
    /// Length of the run.
    pub size: usize,
}

/// Longest-matching-block sequence matcher.
pub struct SequenceMatcher<'a, T> {
    a: &'a [T],
    b: &'a [T],
    b2j: HashMap<&'a T, Vec<usize>>,
}

/// Sequences at least this long drop "popular" elements from the index.
const AUTOJUNK_MIN_LEN: usize = 200;

impl<'a, T: Eq + Hash> SequenceMatcher<'a, T> {
    /// Indexes `b` and prepares to compare it against `a`.
    pub fn new(a: &'a [T], b: &'a [T]) -> Self {
        let mut b2j: HashMap<&'a T, Vec<usize>> = HashMap::new();
        for (index, element) in b.iter().enumerate() {
            b2j.entry(element).or_default().push(index);
        }

        if b.len() >= AUTOJUNK_MIN_LEN {
            let threshold = b.len() / 100 + 1;
            b2j.retain(|_, indices| indices.len() <= threshold);
        }

        Self { a, b, b2j }
    }

    /// Finds the longest matching block in `a[alo..ahi]` and `b[blo..bhi]`.
    ///
    /// Ties resolve to the earliest start in `a`, then in `b`.
    pub fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> Match {
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut next_j2len: HashMap<usize, usize> = HashMap::new();
            if let Some(indices) = self.b2j.get(&self.a[i]) {
                for &j in indices {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let previous = if j == 0 {
                        0
                    } else {
                        j2len.get(&(j - 1)).copied().unwrap_or(0)
                    };
                    let k = previous + 1;
                    next_j2len.insert(j, k);
                    if k > best_size {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_size = k;
                    }
                }
            }
            j2len = next_j2len;
        }

        // Popular elements were left out of the index; extend across them.
        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < ahi
            && best_j + best_size < bhi
            && self.a[best_i + best_size] == self.b[best_j + best_size]
        {
            best_size += 1;
        }

        Match {
            a: best_i,
            b: best_j,
            size: best_size,
        }
    }

    /// Returns the matching blocks, ending with a `(len(a), len(b), 0)` sentinel.
    pub fn matching_blocks(&self) -> Vec<Match> {
        let (la, lb) = (self.a.len(), self.b.len());
        let mut queue = vec![(0, la, 0, lb)];
        let mut blocks = Vec::new();

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let found = self.find_longest_match(alo, ahi, blo, bhi);
            if found.size == 0 {
                continue;
            }
            blocks.push(found);
            if alo < found.a && blo < found.b {
                queue.push((alo, found.a, blo, found.b));
            }
            if found.a + found.size < ahi && found.b + found.size < bhi {
                queue.push((found.a + found.size, ahi, found.b + found.size, bhi));
            }
        }
        blocks.sort();

        let mut collapsed = Vec::with_capacity(blocks.len() + 1);
        let mut current = Match { a: 0, b: 0, size: 0 };
        for block in blocks {
            if current.a + current.size == block.a && current.b + current.size == block.b {
                current.size += block.size;
            } else {
                if current.size > 0 {
                    collapsed.push(current);
                }
                current = block;
            }
        }
        if current.size > 0 {
            collapsed.push(current);
        }
        collapsed.push(Match {
            a: la,
            b: lb,
            size: 0,
        });
        collapsed
    }

    /// Returns the edit operations that turn `a` into `b`.
    pub fn opcodes(&self) -> Vec<Opcode> {
        let mut ops = Vec::new();
        let (mut i, mut j) = (0, 0);
        for block in self.matching_blocks() {
            let tag = match (i < block.a, j < block.b) {
                (true, true) => Some(OpTag::Replace),
                (true, false) => Some(OpTag::Delete),
                (false, true) => Some(OpTag::Insert),
                (false, false) => None,
            };
            if let Some(tag) = tag {
                ops.push(Opcode {
                    tag,
                    a_start: i,
                    a_end: block.a,
                    b_start: j,
                    b_end: block.b,
                });
            }
            i = block.a + block.size;
            j = block.b + block.size;
            if block.size > 0 {
                ops.push(Opcode {
                    tag: OpTag::Equal,
                    a_start: block.a,
                    a_end: i,
                    b_start: block.b,
                    b_end: j,
                });
            }
        }
        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(added: usize, removed: usize, changed: usize) -> DiffResult {
        DiffResult {
            added,
            removed,
            changed,
        }
    }

    #[test]
    fn both_invalid_is_zero() {
        assert_eq!(diff("", "", false), DiffResult::default());
        assert_eq!(diff("<a>", "nope", false), DiffResult::default());
    }

    #[test]
    fn invalid_side_counts_every_line() {
        assert_eq!(diff("<root></root>", "invalid", false), counts(0, 1, 0));
        assert_eq!(diff("", "<a><b/><c/></a>", false), counts(4, 0, 0));
    }

    #[test]
    fn identical_documents_have_no_diff() {
        let doc = "<config><a>1</a><b/></config>";
        assert!(diff(doc, doc, false).is_empty());
    }

    #[test]
    fn formatting_differences_are_ignored() {
        let compact = "<config><a>1</a><b></b></config>";
        let spaced = "<config>\n    <a>1</a>\n    <b/>\n</config>";
        assert!(diff(compact, spaced, false).is_empty());
    }

    #[test]
    fn mixed_changes() {
        let current = "<config><a>1</a><b>2</b><c>3</c></config>";
        let new = "<config><a>1</a><b>two</b><c>3</c><d/><e/></config>";
        assert_eq!(diff(current, new, false), counts(2, 0, 1));
    }

    #[test]
    fn replace_with_more_removed_lines() {
        let current = "<r><a/><b/><c/><z/></r>";
        let new = "<r><x/><z/></r>";
        assert_eq!(diff(current, new, false), counts(0, 2, 1));
    }

    #[test]
    fn ignore_line_whitespace_hides_reindentation() {
        let current = "<r><a><b>1</b></a></r>";
        let new = "<r><b>1</b></r>";
        let strict = diff(current, new, false);
        let loose = diff(current, new, true);
        assert!(strict.changed + strict.removed > loose.changed + loose.removed);
        assert_eq!(loose, counts(0, 2, 0));
    }

    #[test]
    fn opcodes_match_reference_output() {
        let a: Vec<char> = "qabxcd".chars().collect();
        let b: Vec<char> = "abycdf".chars().collect();
        let ops: Vec<_> = SequenceMatcher::new(&a, &b)
            .opcodes()
            .into_iter()
            .map(|op| (op.tag, op.a_start, op.a_end, op.b_start, op.b_end))
            .collect();
        assert_eq!(
            ops,
            vec![
                (OpTag::Delete, 0, 1, 0, 0),
                (OpTag::Equal, 1, 3, 0, 2),
                (OpTag::Replace, 3, 4, 2, 3),
                (OpTag::Equal, 4, 6, 3, 5),
                (OpTag::Insert, 6, 6, 5, 6),
            ]
        );
    }

    #[test]
    fn longest_match_prefers_earliest() {
        let a: Vec<char> = " abcd".chars().collect();
        let b: Vec<char> = "abcd abcd".chars().collect();
        let m = SequenceMatcher::new(&a, &b).find_longest_match(0, 5, 0, 9);
        assert_eq!(m, Match { a: 0, b: 4, size: 5 });
    }

    #[test]
    fn autojunk_still_extends_across_popular_lines() {
        let a: Vec<String> = (0..300).map(|_| "same".to_string()).collect();
        let b = a.clone();
        let blocks = SequenceMatcher::new(&a, &b).matching_blocks();
        assert_eq!(blocks[0], Match { a: 0, b: 0, size: 300 });
    }

    proptest::proptest! {
        #[test]
        fn opcodes_rebuild_second_sequence(
            a in proptest::collection::vec(0u8..4, 0..40),
            b in proptest::collection::vec(0u8..4, 0..40),
        ) {
            let mut rebuilt = Vec::new();
            let mut cursor = 0;
            for op in SequenceMatcher::new(&a, &b).opcodes() {
                proptest::prop_assert_eq!(op.a_start, cursor);
                cursor = op.a_end;
                match op.tag {
                    OpTag::Equal => {
                        proptest::prop_assert_eq!(&a[op.a_start..op.a_end], &b[op.b_start..op.b_end]);
                        rebuilt.extend_from_slice(&a[op.a_start..op.a_end]);
                    }
                    OpTag::Replace | OpTag::Insert => rebuilt.extend_from_slice(&b[op.b_start..op.b_end]),
                    OpTag::Delete => {}
                }
            }
            proptest::prop_assert_eq!(cursor, a.len());
            proptest::prop_assert_eq!(rebuilt, b);
        }
    }

    #[test]
    fn split_lines_matches_python_boundaries() {
        assert_eq!(split_lines("a\nb\r\nc\rd"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines("a\n"), vec!["a"]);
        assert_eq!(split_lines("a\n\nb"), vec!["a", "", "b"]);
        assert!(split_lines("").is_empty());
    }
}
