//! Line-level diff using longest-common-subsequence dynamic programming.
//!
//! Used to compare edit-history versions of a block's content. Pure
//! functions, no state.

use serde::{Deserialize, Serialize};

/// Classification of one diff line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffLineKind {
    Added,
    Removed,
    Unchanged,
}

/// One line of a computed diff, with 1-based line numbers on the sides
/// where the line exists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffLine {
    pub kind: DiffLineKind,
    pub content: String,
    pub old_line: Option<usize>,
    pub new_line: Option<usize>,
}

/// Added/removed/unchanged counts for a diff.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
}

/// Compute a line-level diff between two strings.
pub fn diff_lines(before: &str, after: &str) -> Vec<DiffLine> {
    if before == after {
        return before
            .split('\n')
            .enumerate()
            .map(|(i, content)| DiffLine {
                kind: DiffLineKind::Unchanged,
                content: content.to_string(),
                old_line: Some(i + 1),
                new_line: Some(i + 1),
            })
            .collect();
    }

    let old_lines: Vec<&str> = before.split('\n').collect();
    let new_lines: Vec<&str> = after.split('\n').collect();
    let m = old_lines.len();
    let n = new_lines.len();

    // LCS length table.
    let mut dp = vec![vec![0u32; n + 1]; m + 1];
    for i in 1..=m {
        for j in 1..=n {
            dp[i][j] = if old_lines[i - 1] == new_lines[j - 1] {
                dp[i - 1][j - 1] + 1
            } else {
                dp[i - 1][j].max(dp[i][j - 1])
            };
        }
    }

    // Backtrack from the bottom-right corner.
    let mut result = Vec::with_capacity(m.max(n));
    let (mut i, mut j) = (m, n);
    while i > 0 || j > 0 {
        if i > 0 && j > 0 && old_lines[i - 1] == new_lines[j - 1] {
            result.push(DiffLine {
                kind: DiffLineKind::Unchanged,
                content: old_lines[i - 1].to_string(),
                old_line: Some(i),
                new_line: Some(j),
            });
            i -= 1;
            j -= 1;
        } else if j > 0 && (i == 0 || dp[i][j - 1] >= dp[i - 1][j]) {
            result.push(DiffLine {
                kind: DiffLineKind::Added,
                content: new_lines[j - 1].to_string(),
                old_line: None,
                new_line: Some(j),
            });
            j -= 1;
        } else {
            result.push(DiffLine {
                kind: DiffLineKind::Removed,
                content: old_lines[i - 1].to_string(),
                old_line: Some(i),
                new_line: None,
            });
            i -= 1;
        }
    }

    result.reverse();
    result
}

/// Compute stats from a diff result.
pub fn diff_stats(lines: &[DiffLine]) -> DiffStats {
    let mut stats = DiffStats::default();
    for line in lines {
        match line.kind {
            DiffLineKind::Added => stats.added += 1,
            DiffLineKind::Removed => stats.removed += 1,
            DiffLineKind::Unchanged => stats.unchanged += 1,
        }
    }
    stats
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_inputs_are_all_unchanged() {
        let lines = diff_lines("a\nb\nc", "a\nb\nc");
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.kind == DiffLineKind::Unchanged));
        assert_eq!(lines[1].old_line, Some(2));
        assert_eq!(lines[1].new_line, Some(2));
    }

    #[test]
    fn test_pure_addition() {
        let lines = diff_lines("a\nc", "a\nb\nc");
        let stats = diff_stats(&lines);
        assert_eq!(stats, DiffStats { added: 1, removed: 0, unchanged: 2 });
        let added = lines.iter().find(|l| l.kind == DiffLineKind::Added).unwrap();
        assert_eq!(added.content, "b");
        assert_eq!(added.old_line, None);
        assert_eq!(added.new_line, Some(2));
    }

    #[test]
    fn test_pure_removal() {
        let lines = diff_lines("a\nb\nc", "a\nc");
        let stats = diff_stats(&lines);
        assert_eq!(stats, DiffStats { added: 0, removed: 1, unchanged: 2 });
        let removed = lines.iter().find(|l| l.kind == DiffLineKind::Removed).unwrap();
        assert_eq!(removed.content, "b");
        assert_eq!(removed.old_line, Some(2));
        assert_eq!(removed.new_line, None);
    }

    #[test]
    fn test_replacement() {
        let lines = diff_lines("hello\nworld", "hello\nrust");
        let stats = diff_stats(&lines);
        assert_eq!(stats.added, 1);
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.unchanged, 1);
    }

    #[test]
    fn test_line_numbers_are_one_based_and_monotonic() {
        let lines = diff_lines("a\nb\nc\nd", "a\nx\nc\ny");
        let old_nums: Vec<usize> = lines.iter().filter_map(|l| l.old_line).collect();
        let new_nums: Vec<usize> = lines.iter().filter_map(|l| l.new_line).collect();
        assert_eq!(old_nums, vec![1, 2, 3, 4]);
        assert_eq!(new_nums, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_empty_vs_content() {
        let lines = diff_lines("", "a\nb");
        // "" splits to one empty line; it is removed, both new lines added.
        let stats = diff_stats(&lines);
        assert_eq!(stats.added, 2);
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.unchanged, 0);
    }
}
