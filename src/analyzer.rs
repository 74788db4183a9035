//! Per-block verdict via an ordered decision table, evaluated top to
//! bottom: the first condition that holds wins.
//!
//! Grounded in the original `patcher_core.py::analyze_blocks` and
//! `_get_context_window`, re-expressed using this crate's [`Matcher`],
//! [`differ`], and [`IgnorePolicy`] collaborators and returning a tagged
//! [`PatchVerdict`] instead of mixing status and diagnostics in one record.

use std::path::Path;

use tracing::warn;

use crate::block::PatchBlock;
use crate::differ;
use crate::ignore::IgnorePolicy;
use crate::matcher::{MatchOutcome, Matcher};
use crate::verdict::PatchVerdict;

/// Tunables that affect diagnostic rendering, not the decision logic.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub context_window: usize,
    pub file_preview_chars: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            context_window: 10,
            file_preview_chars: 500,
        }
    }
}

/// Analyze every block in `blocks` against `root`, mutating each block's
/// `valid_match`/`line_number`/`match_quality` in place and returning one
/// verdict per block, in order.
pub fn analyze(
    blocks: &mut [PatchBlock],
    root: &Path,
    ignore: &IgnorePolicy,
    matcher: &Matcher,
    config: &AnalyzerConfig,
) -> Vec<PatchVerdict> {
    blocks
        .iter_mut()
        .map(|block| analyze_one(block, root, ignore, matcher, config))
        .collect()
}

fn analyze_one(
    block: &mut PatchBlock,
    root: &Path,
    ignore: &IgnorePolicy,
    matcher: &Matcher,
    config: &AnalyzerConfig,
) -> PatchVerdict {
    let path = Path::new(&block.filename);
    let full_path = root.join(path);

    if ignore.is_ignored(path) {
        return PatchVerdict::error(
            &block.filename,
            format!("{} is protected by the ignore policy", block.filename),
            vec!["remove from ignore file if you want to patch this file".into()],
            None,
        );
    }

    if !full_path.exists() {
        if block.search_block.trim().is_empty() {
            return match full_path.parent() {
                Some(parent) if parent.exists() => PatchVerdict::success(
                    &block.filename,
                    "new file will be created",
                    "",
                    None,
                    0.0,
                ),
                _ => PatchVerdict::warning(
                    &block.filename,
                    "parent directory will be created",
                    "",
                    None,
                    0.0,
                    vec!["ensure the directory path is correct".into()],
                ),
            };
        }
        return PatchVerdict::error(
            &block.filename,
            "file not found (SEARCH must be empty for new files)",
            vec!["leave SEARCH block empty to create a new file".into()],
            None,
        );
    }

    if block.replace_block.trim().is_empty() {
        return PatchVerdict::warning(
            &block.filename,
            "file will be deleted",
            "",
            None,
            0.0,
            vec!["ensure you want to delete this file completely".into()],
        );
    }

    let content = match std::fs::read_to_string(&full_path) {
        Ok(c) => c,
        Err(e) => {
            return PatchVerdict::error(
                &block.filename,
                format!("cannot read file: {e}"),
                vec![],
                None,
            );
        }
    };

    if block.search_block.trim().is_empty() {
        return PatchVerdict::error(
            &block.filename,
            "SEARCH block is empty for existing file",
            vec!["provide context to locate where to insert code".into()],
            None,
        );
    }

    match matcher.resolve(&block.search_block, &content) {
        MatchOutcome::ExactUnique { found, line_number } => {
            block.valid_match = Some(found.clone());
            block.line_number = Some(line_number);
            block.match_quality = 100.0;
            let diff = differ::unified_diff(&found, &block.replace_block);
            PatchVerdict::success(
                &block.filename,
                format!("exact match found at line {line_number}"),
                diff,
                Some(line_number),
                100.0,
            )
        }
        MatchOutcome::ExactMultiple { count, line_number } => {
            warn!(file = %block.filename, count, "ambiguous exact match");
            let context = context_window(&content, line_number, config.context_window);
            PatchVerdict::error(
                &block.filename,
                format!("ambiguous! found {count} exact matches"),
                vec![
                    "add more surrounding context to make the search unique".into(),
                    "include function/class signatures or unique comments".into(),
                ],
                Some(context),
            )
        }
        MatchOutcome::RegexUnique { found, line_number } => {
            block.valid_match = Some(found.clone());
            block.line_number = Some(line_number);
            block.match_quality = 95.0;
            warn!(file = %block.filename, line_number, "whitespace-flexible match resolved");
            let diff = differ::unified_diff(&found, &block.replace_block);
            PatchVerdict::warning(
                &block.filename,
                format!("match found at line {line_number} (whitespace differences)"),
                diff,
                Some(line_number),
                95.0,
                vec!["review the diff carefully for indentation changes".into()],
            )
        }
        MatchOutcome::RegexMultiple { count, line_number } => {
            let context = context_window(&content, line_number, config.context_window);
            PatchVerdict::error(
                &block.filename,
                format!("found {count} similar blocks"),
                vec!["provide more unique context".into()],
                Some(context),
            )
        }
        MatchOutcome::Fuzzy {
            found,
            line_number,
            similarity,
        } => {
            block.valid_match = Some(found.clone());
            block.line_number = Some(line_number);
            block.match_quality = similarity;
            warn!(file = %block.filename, similarity, "fuzzy match resolved");
            let diff = differ::unified_diff(&found, &block.replace_block);
            PatchVerdict::warning(
                &block.filename,
                format!("fuzzy match at line {line_number} ({similarity:.1}% similar)"),
                diff,
                Some(line_number),
                similarity,
                vec![
                    "verify the match is correct before applying".into(),
                    "the model may have a slightly different version of the code".into(),
                ],
            )
        }
        MatchOutcome::NoMatch {
            best_similarity,
            best_line,
            ..
        } => {
            let context = match best_line {
                Some(line) => context_window(&content, line, 2 * config.context_window),
                None => content.chars().take(config.file_preview_chars).collect(),
            };
            PatchVerdict::error(
                &block.filename,
                format!("no match found, best similarity {best_similarity:.1}"),
                vec![
                    "check if the file has been recently modified".into(),
                    "verify you are editing the correct file".into(),
                    "the model may have hallucinated or used outdated code".into(),
                ],
                Some(context),
            )
        }
    }
}

/// A window of `content` around 1-based `line_number`, `>>>`-marking the
/// candidate line. Mirrors `patcher_core.py::_get_context_window`.
fn context_window(content: &str, line_number: usize, window: usize) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    let idx = line_number.saturating_sub(1);
    let start = idx.saturating_sub(window / 2);
    let end = (idx + window / 2).min(lines.len());

    (start..end)
        .map(|i| {
            let marker = if i == idx { ">>>" } else { "   " };
            format!("{marker} {:>4} | {}", i + 1, lines[i])
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup(dir: &TempDir) -> IgnorePolicy {
        IgnorePolicy::load(&dir.path().join(".patchignore")).unwrap()
    }

    #[test]
    fn test_s1_unique_exact_success() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "hello world\n").unwrap();
        let ignore = setup(&dir);
        let matcher = Matcher::default();
        let mut block = PatchBlock::new("a.txt", "hello", "goodbye");
        let verdict = analyze_one(&mut block, dir.path(), &ignore, &matcher, &AnalyzerConfig::default());
        assert!(verdict.is_success());
        assert_eq!(block.line_number, Some(1));
        assert_eq!(block.match_quality, 100.0);
    }

    #[test]
    fn test_s3_ambiguous_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "x=1\nx=1\n").unwrap();
        let ignore = setup(&dir);
        let matcher = Matcher::default();
        let mut block = PatchBlock::new("a.txt", "x=1", "x=2");
        let verdict = analyze_one(&mut block, dir.path(), &ignore, &matcher, &AnalyzerConfig::default());
        assert!(verdict.is_error());
        assert!(verdict.message().to_lowercase().contains("ambiguous"));
        assert!(block.valid_match.is_none());
    }

    #[test]
    fn test_s5_creation_warning_when_parent_missing() {
        let dir = TempDir::new().unwrap();
        let ignore = setup(&dir);
        let matcher = Matcher::default();
        let mut block = PatchBlock::new("new/mod.txt", "", "hi\n");
        let verdict = analyze_one(&mut block, dir.path(), &ignore, &matcher, &AnalyzerConfig::default());
        assert!(matches!(verdict.kind, crate::verdict::VerdictKind::Warning { .. }));
    }

    #[test]
    fn test_creation_success_when_parent_exists() {
        let dir = TempDir::new().unwrap();
        let ignore = setup(&dir);
        let matcher = Matcher::default();
        let mut block = PatchBlock::new("new.txt", "", "hi\n");
        let verdict = analyze_one(&mut block, dir.path(), &ignore, &matcher, &AnalyzerConfig::default());
        assert!(verdict.is_success());
    }

    #[test]
    fn test_deletion_warning() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "content").unwrap();
        let ignore = setup(&dir);
        let matcher = Matcher::default();
        let mut block = PatchBlock::new("a.txt", "content", "");
        let verdict = analyze_one(&mut block, dir.path(), &ignore, &matcher, &AnalyzerConfig::default());
        assert!(matches!(verdict.kind, crate::verdict::VerdictKind::Warning { .. }));
    }

    #[test]
    fn test_ignored_path_is_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".patchignore"), "*.lock\n").unwrap();
        fs::write(dir.path().join("a.lock"), "x").unwrap();
        let ignore = setup(&dir);
        let matcher = Matcher::default();
        let mut block = PatchBlock::new("a.lock", "x", "y");
        let verdict = analyze_one(&mut block, dir.path(), &ignore, &matcher, &AnalyzerConfig::default());
        assert!(verdict.is_error());
    }

    #[test]
    fn test_empty_search_on_existing_file_is_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "content").unwrap();
        let ignore = setup(&dir);
        let matcher = Matcher::default();
        let mut block = PatchBlock::new("a.txt", "", "more content");
        let verdict = analyze_one(&mut block, dir.path(), &ignore, &matcher, &AnalyzerConfig::default());
        assert!(verdict.is_error());
    }

    #[test]
    fn test_context_window_marks_candidate() {
        let content = (0..20).map(|i| format!("line{i}")).collect::<Vec<_>>().join("\n");
        let window = context_window(&content, 10, 6);
        assert!(window.contains(">>>   10 | line9"));
    }
}
