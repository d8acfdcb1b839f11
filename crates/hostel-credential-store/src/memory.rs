//! Ephemeral in-memory storage.

use crate::{KeyValueStorage, StorageResult};
use std::collections::HashMap;
use std::sync::Mutex;

/// Storage that lives as long as the process. Backs "don't remember me"
/// sessions and doubles as the test backend.
#[derive(Default)]
pub struct MemoryStorage {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut data = self.data.lock().unwrap();
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let data = self.data.lock().unwrap();
        Ok(data.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut data = self.data.lock().unwrap();
        Ok(data.remove(key).is_some())
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> StorageResult<()> {
        let mut data = self.data.lock().unwrap();
        for (key, value) in entries {
            data.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn delete_all(&self, keys: &[&str]) -> StorageResult<()> {
        let mut data = self.data.lock().unwrap();
        for key in keys {
            data.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();

        storage.set("test_key", "test_value").unwrap();
        assert_eq!(storage.get("test_key").unwrap(), Some("test_value".to_string()));

        assert!(storage.has("test_key").unwrap());
        assert!(!storage.has("nonexistent").unwrap());

        assert!(storage.delete("test_key").unwrap());
        assert!(!storage.delete("test_key").unwrap());
        assert_eq!(storage.get("test_key").unwrap(), None);
    }
}
