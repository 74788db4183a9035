//! Append-only journal of transactions, bounded by retention.
//!
//! Grounded in the original `patcher_core.py`'s `_load_history`/
//! `_save_history` (a JSON array written whole each time), but staged
//! through [`crate::atomic::atomic_write`] so the log file itself is never
//! left truncated by a crash mid-write.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::atomic::atomic_write;
use crate::error::PatchResult;

/// What happened to one file within a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Modify,
    Delete,
}

/// One file's operation record within a [`TransactionRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOpRecord {
    pub path: String,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<usize>,
}

/// One entry in the History Log: an atomic group of file operations
/// committed as one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub timestamp: u64,
    pub files: Vec<FileOpRecord>,
}

/// Summary view returned by `history_summary`.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionSummary {
    pub timestamp: u64,
    pub files_changed: usize,
    pub actions: Vec<Action>,
    pub filenames: Vec<String>,
}

impl From<&TransactionRecord> for TransactionSummary {
    fn from(record: &TransactionRecord) -> Self {
        Self {
            timestamp: record.timestamp,
            files_changed: record.files.len(),
            actions: record.files.iter().map(|f| f.action).collect(),
            filenames: record.files.iter().map(|f| f.path.clone()).collect(),
        }
    }
}

/// The on-disk, capped, append-only transaction journal.
pub struct HistoryLog {
    path: PathBuf,
    cap: usize,
}

impl HistoryLog {
    pub fn new(path: PathBuf, cap: usize) -> Self {
        Self { path, cap }
    }

    /// Load all records, oldest first. An absent or corrupt file yields an
    /// empty log, matching the original's tolerant `_load_history`.
    pub fn load(&self) -> Vec<TransactionRecord> {
        let Ok(content) = fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    fn save(&self, records: &[TransactionRecord]) -> PatchResult<()> {
        let json = serde_json::to_string_pretty(records)?;
        atomic_write(&self.path, json.as_bytes())?;
        Ok(())
    }

    /// Append `record`, dropping the oldest entries in-place if the cap is
    /// exceeded.
    pub fn append(&self, record: TransactionRecord) -> PatchResult<()> {
        let mut records = self.load();
        records.push(record);
        if records.len() > self.cap {
            let excess = records.len() - self.cap;
            records.drain(0..excess);
        }
        self.save(&records)
    }

    /// Remove and return the most recent record, if any.
    pub fn pop_last(&self) -> PatchResult<Option<TransactionRecord>> {
        let mut records = self.load();
        let popped = records.pop();
        if popped.is_some() {
            self.save(&records)?;
        }
        Ok(popped)
    }

    /// Peek the most recent record without removing it.
    pub fn peek_last(&self) -> Option<TransactionRecord> {
        self.load().into_iter().next_back()
    }

    /// Most recent `limit` records, newest first.
    pub fn summary(&self, limit: usize) -> Vec<TransactionSummary> {
        let records = self.load();
        records
            .iter()
            .rev()
            .take(limit)
            .map(TransactionSummary::from)
            .collect()
    }
}
