//! Diff rendering for dry-run previews.

use crate::processor::FileChange;
use similar::{ChangeTag, TextDiff};
use std::borrow::Cow;
use std::fmt;

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

/// Generates a unified diff of a change.
pub fn unified_diff(change: &FileChange) -> String {
    render(change, false)
}

/// Generates a unified diff with ANSI colors for terminal display.
pub fn colorized_diff(change: &FileChange) -> String {
    render(change, true)
}

fn render(change: &FileChange, color: bool) -> String {
    let original = text(&change.original);
    let transformed = text(&change.transformed);
    let diff = TextDiff::from_lines(original.as_ref(), transformed.as_ref());
    let paint = |code: &'static str| if color { code } else { "" };
    let reset = if color { RESET } else { "" };

    let path = change.path.display();
    let mut output = format!(
        "{cyan}--- a/{path}{reset}\n{cyan}+++ b/{path}{reset}\n",
        cyan = paint(CYAN)
    );

    for (idx, group) in diff.grouped_ops(3).iter().enumerate() {
        if idx > 0 {
            output.push_str("@@\n");
        }
        for op in group {
            for line in diff.iter_changes(op) {
                let (sign, code) = match line.tag() {
                    ChangeTag::Delete => ("-", paint(RED)),
                    ChangeTag::Insert => ("+", paint(GREEN)),
                    ChangeTag::Equal => (" ", ""),
                };
                let end = if code.is_empty() { "" } else { reset };
                output.push_str(code);
                output.push_str(sign);
                output.push_str(line.value());
                output.push_str(end);
                if line.missing_newline() {
                    output.push('\n');
                }
            }
        }
    }

    output
}

fn text(content: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(content)
}

/// Line counts over a set of changes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiffSummary {
    pub files_changed: usize,
    pub insertions: usize,
    pub deletions: usize,
}

impl DiffSummary {
    /// Counts the inserted and deleted lines of one change.
    pub fn from_change(change: &FileChange) -> Self {
        let original = text(&change.original);
        let transformed = text(&change.transformed);
        let diff = TextDiff::from_lines(original.as_ref(), transformed.as_ref());

        let mut summary = Self::default();
        for line in diff.iter_all_changes() {
            match line.tag() {
                ChangeTag::Insert => summary.insertions += 1,
                ChangeTag::Delete => summary.deletions += 1,
                ChangeTag::Equal => {}
            }
        }
        if change.is_modified() {
            summary.files_changed = 1;
        }
        summary
    }

    /// Sums the summaries of many changes.
    pub fn total<'a>(changes: impl IntoIterator<Item = &'a FileChange>) -> Self {
        changes
            .into_iter()
            .map(Self::from_change)
            .fold(Self::default(), |mut acc, s| {
                acc.merge(&s);
                acc
            })
    }

    /// Combines two summaries.
    pub fn merge(&mut self, other: &DiffSummary) {
        self.files_changed += other.files_changed;
        self.insertions += other.insertions;
        self.deletions += other.deletions;
    }
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} file(s) changed, {} insertions(+), {} deletions(-)",
            self.files_changed, self.insertions, self.deletions
        )
    }
}
