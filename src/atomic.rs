//! Write-to-temp-then-rename helper, shared by the Transactor, Backup
//! Store, and History Log so that no file is ever observed half-written.
//!
//! Grounded in `cortex-engine/src/tools/handlers/edit_file.rs::atomic_write_file`.

use std::fs;
use std::io::Write;
use std::path::Path;

/// Write `content` to `path` atomically: write to a same-directory temp
/// file, fsync, then rename into place.
pub fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path has no parent directory",
        )
    })?;
    fs::create_dir_all(parent)?;

    let temp_path = parent.join(format!(
        ".{}.tmp.{}",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file"),
        std::process::id()
    ));

    {
        let mut temp_file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        temp_file.write_all(content)?;
        temp_file.sync_all()?;
    }

    #[cfg(unix)]
    {
        fs::rename(&temp_path, path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            e
        })?;
    }

    #[cfg(windows)]
    {
        if path.exists() {
            let mut retries = 3;
            loop {
                match fs::remove_file(path) {
                    Ok(()) => break,
                    Err(e) if retries > 0 => {
                        retries -= 1;
                        std::thread::sleep(std::time::Duration::from_millis(50));
                    }
                    Err(e) => {
                        let _ = fs::remove_file(&temp_path);
                        return Err(e);
                    }
                }
            }
        }
        fs::rename(&temp_path, path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            e
        })?;
    }

    Ok(())
}
