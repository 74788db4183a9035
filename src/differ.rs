//! Renders unified and side-by-side diffs between two text bodies.
//!
//! Grounded in `cortex-apply-patch/src/fuzzy.rs`'s use of the `similar`
//! crate for text diffing; this module drives `similar::TextDiff` over
//! whole files rather than single lines.

use similar::{ChangeTag, TextDiff};

/// One cell in a side-by-side diff row.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffCell {
    pub line_number: Option<usize>,
    pub text: String,
    pub kind: CellKind,
}

impl DiffCell {
    fn empty() -> Self {
        Self {
            line_number: None,
            text: String::new(),
            kind: CellKind::Empty,
        }
    }
}

/// Kind of a side-by-side cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Equal,
    Delete,
    Insert,
    Empty,
}

/// One aligned row of a side-by-side diff.
#[derive(Debug, Clone, PartialEq)]
pub struct SideBySideRow {
    pub left: DiffCell,
    pub right: DiffCell,
}

/// Render a standard unified diff, three lines of context, line terminators
/// stripped.
pub fn unified_diff(original: &str, modified: &str) -> String {
    let diff = TextDiff::from_lines(original, modified);
    let rendered = diff.unified_diff().context_radius(3).to_string();
    rendered
        .lines()
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render an aligned side-by-side diff: equal runs on both sides with
/// matching line numbers, deletes on the left, inserts on the right,
/// replaces rendering deleted lines above inserted lines.
pub fn side_by_side(original: &str, modified: &str) -> Vec<SideBySideRow> {
    let diff = TextDiff::from_lines(original, modified);
    let mut rows = Vec::new();

    for op in diff.ops() {
        for change in diff.iter_changes(op) {
            let text = change.value().trim_end_matches('\n').to_string();
            match change.tag() {
                ChangeTag::Equal => {
                    rows.push(SideBySideRow {
                        left: DiffCell {
                            line_number: change.old_index().map(|i| i + 1),
                            text: text.clone(),
                            kind: CellKind::Equal,
                        },
                        right: DiffCell {
                            line_number: change.new_index().map(|i| i + 1),
                            text,
                            kind: CellKind::Equal,
                        },
                    });
                }
                ChangeTag::Delete => {
                    rows.push(SideBySideRow {
                        left: DiffCell {
                            line_number: change.old_index().map(|i| i + 1),
                            text,
                            kind: CellKind::Delete,
                        },
                        right: DiffCell::empty(),
                    });
                }
                ChangeTag::Insert => {
                    rows.push(SideBySideRow {
                        left: DiffCell::empty(),
                        right: DiffCell {
                            line_number: change.new_index().map(|i| i + 1),
                            text,
                            kind: CellKind::Insert,
                        },
                    });
                }
            }
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unified_diff_basic() {
        let out = unified_diff("hello world\n", "goodbye world\n");
        assert!(out.contains("-hello world"));
        assert!(out.contains("+goodbye world"));
    }

    #[test]
    fn test_side_by_side_equal_and_replace() {
        let original = "a\nb\nc\n";
        let modified = "a\nX\nc\n";
        let rows = side_by_side(original, modified);
        assert!(rows.iter().any(|r| r.left.kind == CellKind::Delete));
        assert!(rows.iter().any(|r| r.right.kind == CellKind::Insert));
        assert!(
            rows.iter()
                .any(|r| r.left.kind == CellKind::Equal && r.right.kind == CellKind::Equal)
        );
    }

    #[test]
    fn test_side_by_side_replace_order() {
        let original = "old1\nold2\n";
        let modified = "new1\nnew2\nnew3\n";
        let rows = side_by_side(original, modified);
        let first_insert = rows.iter().position(|r| r.right.kind == CellKind::Insert);
        let first_delete = rows.iter().position(|r| r.left.kind == CellKind::Delete);
        if let (Some(ins), Some(del)) = (first_insert, first_delete) {
            assert!(del <= ins, "deleted rows should render above inserted rows");
        }
    }
}
