//! Storage trait definitions.

use crate::StorageResult;

/// Trait for key-value storage backends
pub trait KeyValueStorage: Send + Sync {
    /// Store a value
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Retrieve a value
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Delete a value, returning whether it existed
    fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Check if a key exists
    fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Store several values as one update where the backend can.
    fn set_all(&self, entries: &[(&str, &str)]) -> StorageResult<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Delete several values as one update where the backend can.
    fn delete_all(&self, keys: &[&str]) -> StorageResult<()> {
        for key in keys {
            self.delete(key)?;
        }
        Ok(())
    }
}

/// Lets several owners share one backend, e.g. a store and a test inspecting it.
impl<T: KeyValueStorage + ?Sized> KeyValueStorage for std::sync::Arc<T> {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        (**self).delete(key)
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> StorageResult<()> {
        (**self).set_all(entries)
    }

    fn delete_all(&self, keys: &[&str]) -> StorageResult<()> {
        (**self).delete_all(keys)
    }
}
