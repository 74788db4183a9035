//! Locates a search block within file content via a three-tier cascade:
//! exact substring, whitespace-flexible regex, then fuzzy sliding window.
//!
//! The similarity calculation is grounded in
//! `cortex-apply-patch/src/fuzzy.rs::FuzzyMatcher::line_similarity`, which
//! counts `similar::ChangeTag::Equal` runs over a char-level diff to
//! approximate a longest-common-subsequence ratio; here it is generalized
//! from single lines to whole (possibly multi-line) whitespace-collapsed
//! windows.

use regex::Regex;
use similar::{ChangeTag, TextDiff};

/// Outcome of resolving a search block against file content.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// Exactly one byte-for-byte occurrence.
    ExactUnique { found: String, line_number: usize },
    /// More than one byte-for-byte occurrence; `count` total.
    ExactMultiple { count: usize, line_number: usize },
    /// Exactly one whitespace-flexible regex match.
    RegexUnique { found: String, line_number: usize },
    /// More than one whitespace-flexible regex match.
    RegexMultiple { count: usize, line_number: usize },
    /// Best fuzzy window met the similarity threshold.
    Fuzzy {
        found: String,
        line_number: usize,
        similarity: f64,
    },
    /// No strategy resolved a target; best fuzzy window kept as diagnostic.
    NoMatch {
        best_similarity: f64,
        best_window: Option<String>,
        best_line: Option<usize>,
    },
}

/// Resolves search blocks against file content using the three-tier cascade.
#[derive(Debug, Clone)]
pub struct Matcher {
    /// Minimum fuzzy-window similarity (0-100) to resolve as a warning.
    pub fuzzy_threshold: f64,
}

impl Default for Matcher {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 80.0,
        }
    }
}

impl Matcher {
    pub fn new(fuzzy_threshold: f64) -> Self {
        Self { fuzzy_threshold }
    }

    /// Run the cascade and return the first decisive result.
    pub fn resolve(&self, search: &str, content: &str) -> MatchOutcome {
        if let Some(outcome) = self.try_exact(search, content) {
            return outcome;
        }
        if let Some(outcome) = self.try_regex(search, content) {
            return outcome;
        }
        self.try_fuzzy(search, content)
    }

    fn try_exact(&self, search: &str, content: &str) -> Option<MatchOutcome> {
        let count = content.matches(search).count();
        if count == 0 {
            return None;
        }
        let start = content.find(search).unwrap();
        let line_number = 1 + content[..start].matches('\n').count();
        Some(if count == 1 {
            MatchOutcome::ExactUnique {
                found: search.to_string(),
                line_number,
            }
        } else {
            MatchOutcome::ExactMultiple { count, line_number }
        })
    }

    fn try_regex(&self, search: &str, content: &str) -> Option<MatchOutcome> {
        let pattern = flexible_regex_pattern(search)?;
        let re = Regex::new(&format!("(?s){pattern}")).ok()?;
        let matches: Vec<_> = re.find_iter(content).collect();
        if matches.is_empty() {
            return None;
        }
        let first = matches[0];
        let line_number = 1 + content[..first.start()].matches('\n').count();
        Some(if matches.len() == 1 {
            MatchOutcome::RegexUnique {
                found: first.as_str().to_string(),
                line_number,
            }
        } else {
            MatchOutcome::RegexMultiple {
                count: matches.len(),
                line_number,
            }
        })
    }

    fn try_fuzzy(&self, search: &str, content: &str) -> MatchOutcome {
        let content_lines: Vec<&str> = content.split('\n').collect();
        let search_len = search.split('\n').count().max(1);

        let mut best_score = -1.0f64;
        let mut best_window: Option<String> = None;
        let mut best_line: Option<usize> = None;

        if search_len <= content_lines.len() {
            for start in 0..=(content_lines.len() - search_len) {
                let window = content_lines[start..start + search_len].join("\n");
                let score = collapsed_similarity(search, &window);
                if score > best_score {
                    best_score = score;
                    best_window = Some(window);
                    best_line = Some(start + 1);
                }
            }
        }

        let best_score = best_score.max(0.0);

        if best_score >= self.fuzzy_threshold {
            MatchOutcome::Fuzzy {
                found: best_window.unwrap_or_default(),
                line_number: best_line.unwrap_or(1),
                similarity: best_score,
            }
        } else {
            MatchOutcome::NoMatch {
                best_similarity: best_score,
                best_window,
                best_line,
            }
        }
    }
}

/// Tokenize into maximal runs of word characters and single non-space
/// non-word characters, escape each token, join with `\s*`.
fn flexible_regex_pattern(search: &str) -> Option<String> {
    let trimmed = search.trim();
    if trimmed.is_empty() {
        return None;
    }
    let token_re = Regex::new(r"[A-Za-z0-9_]+|[^\s\w]").unwrap();
    let tokens: Vec<String> = token_re
        .find_iter(trimmed)
        .map(|m| regex::escape(m.as_str()))
        .collect();
    if tokens.is_empty() {
        return None;
    }
    Some(tokens.join(r"\s*"))
}

/// Collapse whitespace runs to single spaces on both sides, then compute a
/// longest-common-subsequence-style ratio scaled to `[0, 100]`.
pub fn collapsed_similarity(a: &str, b: &str) -> f64 {
    let a = collapse_whitespace(a);
    let b = collapse_whitespace(b);

    if a == b {
        return 100.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let diff = TextDiff::from_chars(&a, &b);
    let mut same = 0usize;
    let mut total = 0usize;
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Equal => {
                same += 1;
                total += 1;
            }
            _ => total += 1,
        }
    }

    if total == 0 {
        100.0
    } else {
        (same as f64 / total as f64) * 100.0
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
