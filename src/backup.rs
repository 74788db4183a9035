//! Copy-on-write snapshot store used by the Transactor before any
//! destructive write.
//!
//! Grounded in `cortex-apply-patch/src/backup.rs` (API shape: a manager
//! struct over a backup directory, `fs::copy`-based snapshot/restore), but
//! using a flatter, no-metadata-file on-disk layout
//! (`<basename>_<timestamp>.bak`) matching `patcher_core.py`'s
//! `_clean_old_backups` rather than a per-transaction subdirectory plus
//! `metadata.json`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::error::{EngineError, PatchResult};

/// Manages backup snapshots for one working directory.
pub struct BackupStore {
    dir: PathBuf,
    retention: Duration,
}

impl BackupStore {
    /// Open (creating if absent) the backup directory and purge any
    /// snapshot older than `retention`, best-effort.
    pub fn open(dir: PathBuf, retention: Duration) -> PatchResult<Self> {
        fs::create_dir_all(&dir)?;
        let store = Self { dir, retention };
        store.purge_expired();
        Ok(store)
    }

    fn purge_expired(&self) {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };
        let cutoff = SystemTime::now()
            .checked_sub(self.retention)
            .unwrap_or(UNIX_EPOCH);
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("bak") {
                continue;
            }
            if let Ok(meta) = entry.metadata()
                && let Ok(modified) = meta.modified()
                && modified < cutoff
                && fs::remove_file(&path).is_ok()
            {
                debug!(path = %path.display(), "purged expired backup");
            }
        }
    }

    /// Snapshot `source` under `<basename>_<timestamp>.bak` and return the
    /// backup's path. `timestamp` is the transaction timestamp, so that
    /// two files with identical basenames in one transaction never collide
    /// and repeated backups of the same file across transactions don't
    /// overwrite each other either.
    pub fn snapshot(&self, source: &Path, timestamp: u64) -> PatchResult<PathBuf> {
        let basename = source
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file");
        let backup_path = self.dir.join(format!("{basename}_{timestamp}.bak"));
        fs::copy(source, &backup_path).map_err(EngineError::Io)?;
        Ok(backup_path)
    }

    /// Restore `backup_path` over `dest`, creating parent directories as
    /// needed.
    pub fn restore(&self, backup_path: &Path, dest: &Path) -> PatchResult<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(backup_path, dest).map_err(EngineError::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_snapshot_and_restore_round_trip() {
        let work = TempDir::new().unwrap();
        let backups = TempDir::new().unwrap();
        let file = work.path().join("a.txt");
        fs::write(&file, "original").unwrap();

        let store = BackupStore::open(backups.path().to_path_buf(), Duration::from_secs(7 * 86400))
            .unwrap();
        let backup_path = store.snapshot(&file, 1_700_000_000).unwrap();
        assert!(backup_path.exists());
        assert!(
            backup_path
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("a.txt_1700000000")
        );

        fs::write(&file, "mutated").unwrap();
        store.restore(&backup_path, &file).unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "original");
    }

    #[test]
    fn test_timestamp_prevents_basename_collision() {
        let work = TempDir::new().unwrap();
        let backups = TempDir::new().unwrap();
        let file = work.path().join("a.txt");
        fs::write(&file, "v1").unwrap();

        let store = BackupStore::open(backups.path().to_path_buf(), Duration::from_secs(86400))
            .unwrap();
        let p1 = store.snapshot(&file, 100).unwrap();
        fs::write(&file, "v2").unwrap();
        let p2 = store.snapshot(&file, 200).unwrap();
        assert_ne!(p1, p2);
        assert_eq!(fs::read_to_string(&p1).unwrap(), "v1");
        assert_eq!(fs::read_to_string(&p2).unwrap(), "v2");
    }

    #[test]
    fn test_purge_expired_on_open() {
        let backups = TempDir::new().unwrap();
        let stale = backups.path().join("old.txt_1.bak");
        fs::write(&stale, "stale").unwrap();
        let old_time = SystemTime::now() - Duration::from_secs(30 * 86400);
        let file = fs::File::open(&stale).unwrap();
        file.set_modified(old_time).unwrap();
        drop(file);

        let _store =
            BackupStore::open(backups.path().to_path_buf(), Duration::from_secs(7 * 86400))
                .unwrap();
        assert!(!stale.exists());
    }
}
