//! Commits analyzed blocks to disk as one atomic transaction, and reverses
//! the most recent one.
//!
//! Grounded in the original `patcher_core.py`'s `apply_patches` (preflight
//! halt, per-file create/delete/modify, backup-before-write, history
//! append, best-effort auto-stage) and `undo_last` (verify-then-restore
//! with a hash tamper guard), re-expressed with [`crate::atomic::atomic_write`]
//! so every destructive write is staged-then-renamed rather than written
//! in place.

use std::path::Path;

use tracing::{info, warn};

use crate::atomic::atomic_write;
use crate::backup::BackupStore;
use crate::block::PatchBlock;
use crate::error::{EngineError, PatchResult};
use crate::hash::hash_file;
use crate::history::{Action, FileOpRecord, HistoryLog, TransactionRecord};
use crate::vcs;

/// Outcome of a successful [`Transactor::apply`].
#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub record: TransactionRecord,
    pub staged: bool,
}

/// Applies and undoes transactions against one working directory.
pub struct Transactor<'a> {
    root: &'a Path,
    backups: &'a BackupStore,
    history: &'a HistoryLog,
}

impl<'a> Transactor<'a> {
    pub fn new(root: &'a Path, backups: &'a BackupStore, history: &'a HistoryLog) -> Self {
        Self {
            root,
            backups,
            history,
        }
    }

    /// Apply every `enabled` block with a usable verdict. Preflight first:
    /// any existing-file block with a non-blank search that lacks a
    /// `valid_match` halts the whole transaction before any write occurs.
    /// `timestamp` is caller-supplied (the engine forbids wall-clock reads
    /// in library code that must stay deterministic under test).
    pub fn apply(
        &self,
        blocks: &[PatchBlock],
        timestamp: u64,
        auto_stage: bool,
    ) -> PatchResult<ApplyReport> {
        let candidates: Vec<&PatchBlock> = blocks.iter().filter(|b| b.enabled).collect();

        // Mirrors `patcher_core.py::apply_patches`'s preflight check exactly:
        // deletion blocks are NOT exempt, so a deletion with a non-blank
        // SEARCH halts here too (the analyzer never assigns `valid_match`
        // to a deletion block, since it short-circuits before the matcher
        // cascade); to delete a whole file, leave SEARCH blank, same
        // convention as creation.
        let mut halts = 0usize;
        for block in &candidates {
            let full_path = self.root.join(&block.filename);
            let is_existing = full_path.exists();
            let is_search_blank = block.search_block.trim().is_empty();
            if is_existing && !is_search_blank && block.valid_match.is_none() {
                halts += 1;
            }
        }
        if halts > 0 {
            return Err(EngineError::PreflightHalt(halts));
        }

        let mut files = Vec::with_capacity(candidates.len());
        for block in &candidates {
            files.push(self.apply_one(block, timestamp)?);
        }

        let record = TransactionRecord { timestamp, files };
        self.history.append(record.clone())?;
        info!(files = record.files.len(), "transaction committed");

        let staged = if auto_stage {
            let paths: Vec<String> = record.files.iter().map(|f| f.path.clone()).collect();
            vcs::stage_files(self.root, &paths)
        } else {
            false
        };

        Ok(ApplyReport { record, staged })
    }

    fn apply_one(&self, block: &PatchBlock, timestamp: u64) -> PatchResult<FileOpRecord> {
        let full_path = self.root.join(&block.filename);
        let exists = full_path.exists();

        if !exists {
            let pre_hash = hash_file(&full_path).map_err(EngineError::Io)?;
            atomic_write(&full_path, block.replace_block.as_bytes())
                .map_err(|e| EngineError::WriteFailed {
                    path: full_path.clone(),
                    source: e,
                })?;
            let post_hash = hash_file(&full_path).map_err(EngineError::Io)?;
            return Ok(FileOpRecord {
                path: block.filename.clone(),
                action: Action::Create,
                backup_path: None,
                pre_hash: Some(pre_hash),
                post_hash: Some(post_hash),
                line_number: block.line_number,
            });
        }

        if block.replace_block.trim().is_empty() {
            let pre_hash = hash_file(&full_path).map_err(EngineError::Io)?;
            let backup_path = self.backups.snapshot(&full_path, timestamp)?;
            std::fs::remove_file(&full_path).map_err(|e| EngineError::WriteFailed {
                path: full_path.clone(),
                source: e,
            })?;
            return Ok(FileOpRecord {
                path: block.filename.clone(),
                action: Action::Delete,
                backup_path: Some(backup_path),
                pre_hash: Some(pre_hash),
                post_hash: Some(crate::hash::EMPTY_HASH.to_string()),
                line_number: block.line_number,
            });
        }

        let pre_hash = hash_file(&full_path).map_err(EngineError::Io)?;
        let backup_path = self.backups.snapshot(&full_path, timestamp)?;
        let current = std::fs::read_to_string(&full_path).map_err(EngineError::Io)?;
        let target = match &block.valid_match {
            Some(found) => current.replacen(found, &block.replace_block, 1),
            None => current,
        };
        atomic_write(&full_path, target.as_bytes()).map_err(|e| EngineError::WriteFailed {
            path: full_path.clone(),
            source: e,
        })?;
        let post_hash = hash_file(&full_path).map_err(EngineError::Io)?;

        Ok(FileOpRecord {
            path: block.filename.clone(),
            action: Action::Modify,
            backup_path: Some(backup_path),
            pre_hash: Some(pre_hash),
            post_hash: Some(post_hash),
            line_number: block.line_number,
        })
    }

    /// Reverse the most recent transaction. Verifies every modified or
    /// deleted file's current hash still matches what apply last wrote
    /// before touching anything; a mismatch refuses the whole undo and
    /// leaves history untouched.
    pub fn undo_last(&self) -> PatchResult<TransactionRecord> {
        let Some(record) = self.history.peek_last() else {
            return Err(EngineError::NoTransactionToUndo);
        };

        for file in &record.files {
            let full_path = self.root.join(&file.path);
            let current = hash_file(&full_path).map_err(EngineError::Io)?;
            if let Some(expected) = &file.post_hash
                && &current != expected
            {
                warn!(path = %file.path, "undo refused: file tampered since apply");
                return Err(EngineError::UndoRefusedTampered {
                    path: file.path.clone(),
                });
            }
        }

        for file in &record.files {
            self.restore_one(file)?;
        }

        self.history.pop_last()?;
        info!(files = record.files.len(), "transaction undone");
        Ok(record)
    }

    fn restore_one(&self, file: &FileOpRecord) -> PatchResult<()> {
        let full_path = self.root.join(&file.path);
        match file.action {
            Action::Create => {
                std::fs::remove_file(&full_path).map_err(|e| EngineError::UndoRestoreFailed {
                    path: file.path.clone(),
                    message: e.to_string(),
                })?;
            }
            Action::Delete | Action::Modify => {
                let backup_path =
                    file.backup_path
                        .as_ref()
                        .ok_or_else(|| EngineError::UndoRestoreFailed {
                            path: file.path.clone(),
                            message: "missing backup path in history entry".into(),
                        })?;
                self.backups.restore(backup_path, &full_path)?;
            }
        }
        Ok(())
    }
}

/// Reads a file's content for preview, truncated to `max_chars`, used by
/// the `file_content` external operation. A truncated read gets a trailing
/// marker noting the original length, so a caller can tell a truncated
/// preview from a whole small file.
pub fn file_content(root: &Path, relative: &str, max_chars: usize) -> PatchResult<String> {
    let full_path = root.join(relative);
    let content = std::fs::read_to_string(&full_path).map_err(EngineError::Io)?;
    let total_chars = content.chars().count();
    if total_chars <= max_chars {
        return Ok(content);
    }
    let truncated: String = content.chars().take(max_chars).collect();
    Ok(format!("{truncated}\n\n... (truncated, {total_chars} total chars)"))
}
