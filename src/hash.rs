//! Stable content digest of a file, used for tamper detection on undo.

use std::path::Path;

use sha2::{Digest, Sha256};

/// Sentinel returned for a path that does not exist.
pub const EMPTY_HASH: &str = "EMPTY";

/// SHA-256 hex digest of the file at `path`, or [`EMPTY_HASH`] if it is
/// absent.
pub fn hash_file(path: &Path) -> std::io::Result<String> {
    if !path.exists() {
        return Ok(EMPTY_HASH.to_string());
    }
    let bytes = std::fs::read(path)?;
    Ok(hash_bytes(&bytes))
}

/// SHA-256 hex digest of in-memory bytes.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_sentinel() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.txt");
        assert_eq!(hash_file(&path).unwrap(), EMPTY_HASH);
    }

    #[test]
    fn test_stable_hash() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hello").unwrap();
        let h1 = hash_file(&path).unwrap();
        let h2 = hash_file(&path).unwrap();
        assert_eq!(h1, h2);
        assert_ne!(h1, EMPTY_HASH);
    }

    #[test]
    fn test_different_content_different_hash() {
        assert_ne!(hash_bytes(b"a"), hash_bytes(b"b"));
    }
}
