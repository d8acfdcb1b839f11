//! Durable JSON-file storage.

use crate::{KeyValueStorage, StorageError, StorageResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Storage backed by a single JSON object on disk.
///
/// Every call re-reads the file, so a second client process sharing the
/// same file observes the latest write. Mutations go through a temp file
/// and a rename; a reader never sees a half-written file.
pub struct FileStorage {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStorage {
    /// Open (or lazily create) the storage file at `path`.
    ///
    /// An existing file that is not a JSON object of strings is rejected
    /// up front rather than overwritten on the first write.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let storage = Self {
            path: path.into(),
            lock: Mutex::new(()),
        };
        storage.load()?;
        Ok(storage)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<BTreeMap<String, String>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            StorageError::Encoding(format!(
                "credential file {} is not a JSON object of strings: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)?;
        restrict_permissions(&tmp_path)?;
        std::fs::rename(&tmp_path, &self.path)?;

        debug!(path = %self.path.display(), keys = entries.len(), "Credential file written");
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> StorageResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> StorageResult<()> {
    Ok(())
}

impl KeyValueStorage for FileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.set_all(&[(key, value)])
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.lock().unwrap();
        Ok(self.load()?.remove(key))
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let _guard = self.lock.lock().unwrap();
        let mut entries = self.load()?;
        if entries.remove(key).is_none() {
            return Ok(false);
        }
        self.persist(&entries)?;
        Ok(true)
    }

    /// One load and one rename for the whole batch.
    fn set_all(&self, updates: &[(&str, &str)]) -> StorageResult<()> {
        let _guard = self.lock.lock().unwrap();
        let mut entries = self.load()?;
        for (key, value) in updates {
            entries.insert(key.to_string(), value.to_string());
        }
        self.persist(&entries)
    }

    fn delete_all(&self, keys: &[&str]) -> StorageResult<()> {
        let _guard = self.lock.lock().unwrap();
        let mut entries = self.load()?;
        let before = entries.len();
        for key in keys {
            entries.remove(*key);
        }
        if entries.len() == before {
            return Ok(());
        }
        self.persist(&entries)
    }
}
