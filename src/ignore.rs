//! Ordered glob-pattern filter deciding whether a path is protected.
//!
//! Grounded in `cortex-file-search/src/config.rs`'s pattern-list config
//! convention; glob matching itself uses the `globset` crate (ripgrep's
//! glob engine), pulled in from `cyrup-ai-kodegen-tools-filesystem` since
//! `redlittenyoth-cortex` only carries directory-walk ignore matching
//! (the `ignore` crate) rather than single-path glob testing.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use tracing::debug;

use crate::error::PatchResult;

/// Default patterns written to the ignore file on first run.
pub const DEFAULT_PATTERNS: &[&str] = &[
    "*.lock",
    "*.min.js",
    "*.min.css",
    ".env*",
    "node_modules/**",
    "__pycache__/**",
    "*.pyc",
    ".git/**",
];

enum CompiledPattern {
    Glob { raw: String, matcher: GlobMatcher },
    Substring(String),
}

/// Ordered list of patterns read from the ignore file.
pub struct IgnorePolicy {
    patterns: Vec<CompiledPattern>,
}

impl IgnorePolicy {
    /// Load the ignore file at `path`, creating it with defaults if absent.
    pub fn load(path: &Path) -> PatchResult<Self> {
        let raw_patterns = if path.exists() {
            read_patterns(path)?
        } else {
            let defaults: Vec<String> = DEFAULT_PATTERNS.iter().map(|s| s.to_string()).collect();
            fs::write(path, defaults.join("\n"))?;
            defaults
        };

        Ok(Self {
            patterns: raw_patterns.into_iter().map(compile).collect(),
        })
    }

    /// Whether `path` matches any configured pattern.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        for pattern in &self.patterns {
            let hit = match pattern {
                CompiledPattern::Glob { matcher, .. } => matcher.is_match(path),
                CompiledPattern::Substring(s) => path_str.contains(s.as_str()),
            };
            if hit {
                debug!(path = %path_str, "path matched ignore pattern");
                return true;
            }
        }
        false
    }
}

fn read_patterns(path: &Path) -> PatchResult<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn compile(pattern: String) -> CompiledPattern {
    if pattern.contains('*') || pattern.contains('?') {
        match Glob::new(&pattern) {
            Ok(glob) => CompiledPattern::Glob {
                raw: pattern,
                matcher: glob.compile_matcher(),
            },
            Err(_) => CompiledPattern::Substring(pattern),
        }
    } else {
        CompiledPattern::Substring(pattern)
    }
}

/// Join a backup/ignore file name under a base directory; exposed for
/// modules that need a canonical path without round-tripping `IgnorePolicy`.
pub fn ignore_file_path(base: &Path, filename: &str) -> PathBuf {
    base.join(filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_defaults_on_first_run() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join(".patchignore");
        let policy = IgnorePolicy::load(&file).unwrap();
        assert!(file.exists());
        assert!(policy.is_ignored(Path::new("package.lock")));
        assert!(policy.is_ignored(Path::new(".git/HEAD")));
        assert!(!policy.is_ignored(Path::new("src/main.rs")));
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join(".patchignore");
        fs::write(&file, "# a comment\n\n*.secret\n").unwrap();
        let policy = IgnorePolicy::load(&file).unwrap();
        assert!(policy.is_ignored(Path::new("creds.secret")));
    }

    #[test]
    fn test_substring_pattern() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join(".patchignore");
        fs::write(&file, "vendor\n").unwrap();
        let policy = IgnorePolicy::load(&file).unwrap();
        assert!(policy.is_ignored(Path::new("third_party/vendor/lib.rs")));
        assert!(!policy.is_ignored(Path::new("src/lib.rs")));
    }

    #[test]
    fn test_case_sensitive() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join(".patchignore");
        fs::write(&file, "*.LOCK\n").unwrap();
        let policy = IgnorePolicy::load(&file).unwrap();
        assert!(!policy.is_ignored(Path::new("a.lock")));
        assert!(policy.is_ignored(Path::new("a.LOCK")));
    }
}
