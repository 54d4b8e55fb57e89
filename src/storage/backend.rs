//! Key-value backends
//!
//! The store sees its medium as a flat map of string keys to string values,
//! the same contract a browser's local storage offers:
//!
//! - **MemoryBackend**: in-process map with an optional byte quota
//! - **FileBackend**: one JSON file per key under a data directory

use crate::storage::error::{StoreError, StoreResult};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tempfile::NamedTempFile;

/// Flat string key-value storage
pub trait KeyValueBackend: Send + Sync {
    /// Read a value, `None` when the key was never set
    fn get_item(&self, key: &str) -> StoreResult<Option<String>>;

    /// Overwrite the whole value for a key
    fn set_item(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Delete a key; deleting a missing key succeeds
    fn remove_item(&self, key: &str) -> StoreResult<()>;
}

/// In-memory backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    items: RwLock<HashMap<String, String>>,
    /// Maximum total bytes of keys plus values
    quota: Option<usize>,
    disabled: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that rejects writes past `bytes` total
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            quota: Some(bytes),
            ..Default::default()
        }
    }

    /// Backend whose every call fails, like storage turned off in a browser
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Default::default()
        }
    }

    /// Total bytes currently held
    pub fn used_bytes(&self) -> usize {
        self.items
            .read()
            .map(|items| items.iter().map(|(k, v)| k.len() + v.len()).sum())
            .unwrap_or(0)
    }

    fn check_enabled(&self) -> StoreResult<()> {
        if self.disabled {
            Err(StoreError::Unavailable("storage is disabled".to_string()))
        } else {
            Ok(())
        }
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        self.check_enabled()?;
        Ok(self.items.read()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        self.check_enabled()?;
        let mut items = self.items.write()?;

        if let Some(limit) = self.quota {
            let others: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > limit {
                return Err(StoreError::QuotaExceeded { needed, limit });
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StoreResult<()> {
        self.check_enabled()?;
        self.items.write()?.remove(key);
        Ok(())
    }
}

/// File-per-key backend
///
/// Each write goes to its own temp file in the data directory and is renamed
/// into place, so a reader sees either the old or the new value and
/// concurrent writers never share a temp path.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open a backend rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        tracing::debug!(dir = %dir.display(), "Opened file backend");
        Ok(Self { dir })
    }

    /// Directory holding the value files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }
}

impl KeyValueBackend for FileBackend {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.persist(self.path_for(key)).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StoreResult<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_roundtrip() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get_item("a").unwrap(), None);

        backend.set_item("a", "1").unwrap();
        assert_eq!(backend.get_item("a").unwrap().as_deref(), Some("1"));

        backend.remove_item("a").unwrap();
        backend.remove_item("a").unwrap();
        assert_eq!(backend.get_item("a").unwrap(), None);
    }

    #[test]
    fn test_memory_quota() {
        let backend = MemoryBackend::with_quota(10);
        backend.set_item("k", "12345").unwrap();
        // Overwriting the same key only counts the new value
        backend.set_item("k", "123456789").unwrap();
        assert_eq!(backend.used_bytes(), 10);

        let err = backend.set_item("other", "x").unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { limit: 10, .. }));
        assert_eq!(backend.get_item("other").unwrap(), None);
    }

    #[test]
    fn test_memory_disabled() {
        let backend = MemoryBackend::disabled();
        assert!(matches!(
            backend.get_item("a"),
            Err(StoreError::Unavailable(_))
        ));
        assert!(backend.set_item("a", "1").is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(dir.path().join("store")).unwrap();

        assert_eq!(backend.get_item("memeverse_comments").unwrap(), None);
        backend.set_item("memeverse_comments", "{}").unwrap();
        assert_eq!(
            backend.get_item("memeverse_comments").unwrap().as_deref(),
            Some("{}")
        );
        assert!(dir.path().join("store/memeverse_comments.json").exists());

        backend.remove_item("memeverse_comments").unwrap();
        backend.remove_item("memeverse_comments").unwrap();
        assert_eq!(backend.get_item("memeverse_comments").unwrap(), None);
    }

    #[test]
    fn test_file_concurrent_writers_share_directory() {
        let dir = tempdir().unwrap();
        let values: Vec<String> = ["a", "b"].iter().map(|c| c.repeat(20_000)).collect();

        let handles: Vec<_> = values
            .iter()
            .cloned()
            .map(|value| {
                let backend = FileBackend::open(dir.path()).unwrap();
                std::thread::spawn(move || {
                    (0..200)
                        .filter(|_| backend.set_item("k", &value).is_err())
                        .count()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 0);
        }

        let backend = FileBackend::open(dir.path()).unwrap();
        let stored = backend.get_item("k").unwrap().unwrap();
        assert!(values.contains(&stored));

        // Only the value file remains, no stray temp files
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_file_key_sanitized() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        let path = backend.path_for("../escape/key");
        assert_eq!(path, dir.path().join("___escape_key.json"));
    }
}
