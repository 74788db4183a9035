//! Extracts ordered [`PatchBlock`]s from raw LLM output.
//!
//! Grounded in `cortex-apply-patch/src/parser.rs`'s `parse_search_replace`,
//! adapted from that crate's `<<<<<<< SEARCH`/`=======`/`>>>>>>> REPLACE`
//! markers to this engine's wire format:
//!
//! ```text
//! FILE: <path>
//! <<<<< SEARCH
//! <old text>
//! =====
//! <new text>
//! >>>>>
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::block::PatchBlock;

static BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)FILE:[ \t]*(.*?)\n<<<<< SEARCH\n(.*?)\n=====\n(.*?)\n>>>>>").unwrap()
});

/// Parse `text` into zero or more [`PatchBlock`]s, in document order.
///
/// This function is total: it never fails. Text outside recognized blocks
/// is ignored, blocks with an empty or absolute filename are dropped
/// silently, and duplicates are preserved in order.
pub fn parse(text: &str) -> Vec<PatchBlock> {
    let mut blocks = Vec::new();

    for caps in BLOCK_RE.captures_iter(text) {
        let filename = caps[1].trim().to_string();
        if filename.is_empty() || filename.starts_with('/') {
            continue;
        }
        let search = caps[2].to_string();
        let replace = caps[3].to_string();
        blocks.push(PatchBlock::new(filename, search, replace));
    }

    blocks
}
