//! Credential persistence for the InstaSolve client.
//!
//! Two backends sit behind the [`KeyValueStorage`] trait:
//! - **Durable**: a JSON file under `~/.instasolve` ("remember me")
//! - **Ephemeral**: process memory, gone when the client exits
//!
//! [`CredentialStore`] writes the access token, refresh token and user record
//! to one of them and reads back whichever holds a complete set.

mod file;
mod keys;
mod memory;
mod store;
mod traits;
mod user;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use store::{CredentialStore, PersistenceMode, StoredCredentials};
pub use traits::KeyValueStorage;
pub use user::{UnknownUserType, UserRecord, UserType};

use hostel_config_and_utils::Paths;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific failure
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Create the default credential store: a credentials file under `paths`
/// for durable sessions and process memory for ephemeral ones.
pub fn create_credential_store(paths: &Paths) -> StorageResult<CredentialStore> {
    let durable = FileStorage::open(paths.credentials_file())?;
    Ok(CredentialStore::new(
        Box::new(durable),
        Box::new(MemoryStorage::new()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_credential_store_persists_durable_sessions() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().join("state"));
        let user = UserRecord {
            username: "warden1".to_string(),
            user_type: UserType::Warden,
            email: Some("warden1@iiitkottayam.ac.in".to_string()),
            roll_number: None,
        };

        let store = create_credential_store(&paths).unwrap();
        store
            .write(PersistenceMode::Durable, "access", "refresh", &user)
            .unwrap();
        drop(store);

        // A fresh store over the same paths sees the durable session, as a
        // restarted client would.
        let reopened = create_credential_store(&paths).unwrap();
        let stored = reopened.read().unwrap().unwrap();
        assert_eq!(stored.mode, PersistenceMode::Durable);
        assert_eq!(stored.user, user);
    }

    #[test]
    fn test_create_credential_store_forgets_ephemeral_sessions() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let user = UserRecord {
            username: "2023bcy1234".to_string(),
            user_type: UserType::Student,
            email: None,
            roll_number: Some("2023bcy1234".to_string()),
        };

        let store = create_credential_store(&paths).unwrap();
        store
            .write(PersistenceMode::Ephemeral, "access", "refresh", &user)
            .unwrap();
        assert!(store.read().unwrap().is_some());
        drop(store);

        let reopened = create_credential_store(&paths).unwrap();
        assert!(reopened.read().unwrap().is_none());
    }
}
