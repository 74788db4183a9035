//! The parsed edit intent: one `FILE:`/`SEARCH`/`REPLACE` unit.

/// A single parsed edit intent, as produced by the parser and enriched by
/// the analyzer.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchBlock {
    /// Relative path string; never empty, never absolute.
    pub filename: String,
    /// The text the model claims exists in the file. May be empty.
    pub search_block: String,
    /// The text to substitute. May be empty.
    pub replace_block: String,
    /// The exact substring in the current file the matcher resolved, if any.
    pub valid_match: Option<String>,
    /// 1-based line of the match start, if resolved.
    pub line_number: Option<usize>,
    /// Similarity in `[0, 100]`; `0.0` until resolved.
    pub match_quality: f64,
    /// Whether the caller wishes to apply this block.
    pub enabled: bool,
}

impl PatchBlock {
    /// Construct a freshly parsed block: unresolved, enabled by default.
    pub fn new(filename: impl Into<String>, search: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            search_block: search.into(),
            replace_block: replace.into(),
            valid_match: None,
            line_number: None,
            match_quality: 0.0,
            enabled: true,
        }
    }

    /// Re-render this block as the bit-for-bit wire format.
    pub fn to_wire(&self) -> String {
        format!(
            "FILE: {}\n<<<<< SEARCH\n{}\n=====\n{}\n>>>>>",
            self.filename, self.search_block, self.replace_block
        )
    }
}
