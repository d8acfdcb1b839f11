//! High-level API for persisting a session's credentials.

use crate::{KeyValueStorage, StorageError, StorageKeys, StorageResult, UserRecord};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Where a session's credentials live, chosen at login via "remember me".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceMode {
    /// Survives a client restart.
    Durable,
    /// Cleared when the client process ends.
    Ephemeral,
}

impl PersistenceMode {
    /// "Remember me" maps to durable storage.
    pub fn from_remember_me(remember_me: bool) -> Self {
        if remember_me {
            PersistenceMode::Durable
        } else {
            PersistenceMode::Ephemeral
        }
    }

    fn other(self) -> Self {
        match self {
            PersistenceMode::Durable => PersistenceMode::Ephemeral,
            PersistenceMode::Ephemeral => PersistenceMode::Durable,
        }
    }
}

/// A complete credential set read back from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredentials {
    pub mode: PersistenceMode,
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserRecord,
}

/// Write-through persistence for the three session fields under either
/// persistence mode.
pub struct CredentialStore {
    durable: Box<dyn KeyValueStorage>,
    ephemeral: Box<dyn KeyValueStorage>,
}

impl CredentialStore {
    /// Create a store over the given durable and ephemeral backends.
    pub fn new(durable: Box<dyn KeyValueStorage>, ephemeral: Box<dyn KeyValueStorage>) -> Self {
        Self { durable, ephemeral }
    }

    fn backend(&self, mode: PersistenceMode) -> &dyn KeyValueStorage {
        match mode {
            PersistenceMode::Durable => self.durable.as_ref(),
            PersistenceMode::Ephemeral => self.ephemeral.as_ref(),
        }
    }

    /// Store all three fields under `mode` and drop any copy left under the
    /// other mode.
    ///
    /// Either both modes end up holding the new session, or both are put
    /// back to what they held before and the error is returned.
    pub fn write(
        &self,
        mode: PersistenceMode,
        access_token: &str,
        refresh_token: &str,
        user: &UserRecord,
    ) -> StorageResult<()> {
        let user_json =
            serde_json::to_string(user).map_err(|e| StorageError::Encoding(e.to_string()))?;
        let target = self.backend(mode);
        let other = self.backend(mode.other());

        let target_before = Snapshot::take(target)?;
        let other_before = Snapshot::take(other)?;

        let entries = [
            (StorageKeys::ACCESS_TOKEN, access_token),
            (StorageKeys::REFRESH_TOKEN, refresh_token),
            (StorageKeys::USER_DATA, user_json.as_str()),
        ];

        let result = other
            .delete_all(&StorageKeys::ALL)
            .and_then(|()| target.set_all(&entries));
        if let Err(e) = result {
            warn!(mode = ?mode, error = %e, "Credential write failed, restoring previous credentials");
            target_before.restore(target);
            other_before.restore(other);
            return Err(e);
        }

        debug!(mode = ?mode, username = %user.username, "Credentials written");
        Ok(())
    }

    /// Replace only the access token of the session stored under `mode`.
    pub fn write_access_token(&self, mode: PersistenceMode, access_token: &str) -> StorageResult<()> {
        self.backend(mode).set(StorageKeys::ACCESS_TOKEN, access_token)
    }

    /// Read the stored session, preferring durable over ephemeral storage.
    ///
    /// A mode holding only some of the three fields is treated as empty.
    pub fn read(&self) -> StorageResult<Option<StoredCredentials>> {
        for mode in [PersistenceMode::Durable, PersistenceMode::Ephemeral] {
            if let Some(credentials) = self.read_mode(mode)? {
                return Ok(Some(credentials));
            }
        }
        Ok(None)
    }

    fn read_mode(&self, mode: PersistenceMode) -> StorageResult<Option<StoredCredentials>> {
        let backend = self.backend(mode);

        let access_token = backend.get(StorageKeys::ACCESS_TOKEN)?;
        let refresh_token = backend.get(StorageKeys::REFRESH_TOKEN)?;
        let user_json = backend.get(StorageKeys::USER_DATA)?;

        match (access_token, refresh_token, user_json) {
            (Some(access_token), Some(refresh_token), Some(user_json)) => {
                let user: UserRecord = serde_json::from_str(&user_json).map_err(|e| {
                    StorageError::Encoding(format!("stored user record is invalid: {}", e))
                })?;
                Ok(Some(StoredCredentials {
                    mode,
                    access_token,
                    refresh_token,
                    user,
                }))
            }
            (None, None, None) => Ok(None),
            _ => {
                debug!(mode = ?mode, "Ignoring incomplete stored credentials");
                Ok(None)
            }
        }
    }

    /// Remove every credential field from both modes.
    pub fn clear(&self) -> StorageResult<()> {
        Self::clear_backend(self.durable.as_ref())?;
        Self::clear_backend(self.ephemeral.as_ref())?;
        Ok(())
    }

    fn clear_backend(backend: &dyn KeyValueStorage) -> StorageResult<()> {
        backend.delete_all(&StorageKeys::ALL)
    }
}

/// The credential keys of one backend as they were before a write.
struct Snapshot(Vec<(&'static str, Option<String>)>);

impl Snapshot {
    fn take(backend: &dyn KeyValueStorage) -> StorageResult<Self> {
        let mut values = Vec::with_capacity(StorageKeys::ALL.len());
        for key in StorageKeys::ALL {
            values.push((key, backend.get(key)?));
        }
        Ok(Self(values))
    }

    /// Put back every key that no longer holds its snapshot value.
    /// Failures are logged; the caller already has an error to return.
    fn restore(&self, backend: &dyn KeyValueStorage) {
        let mut reset = Vec::new();
        let mut removed = Vec::new();
        for (key, before) in &self.0 {
            if let Ok(current) = backend.get(key) {
                if current == *before {
                    continue;
                }
            }
            match before {
                Some(value) => reset.push((*key, value.as_str())),
                None => removed.push(*key),
            }
        }

        if !reset.is_empty() {
            if let Err(e) = backend.set_all(&reset) {
                warn!(error = %e, "Failed to restore previous credentials");
            }
        }
        if !removed.is_empty() {
            if let Err(e) = backend.delete_all(&removed) {
                warn!(error = %e, "Failed to remove partially written credentials");
            }
        }
    }
}
