//! Storage key constants.

/// Keys written under each persistence mode.
pub struct StorageKeys;

impl StorageKeys {
    /// Short-lived bearer token
    pub const ACCESS_TOKEN: &'static str = "access_token";

    /// Long-lived token exchanged for new access tokens
    pub const REFRESH_TOKEN: &'static str = "refresh_token";

    /// Serialized user record (JSON)
    pub const USER_DATA: &'static str = "user_data";

    /// Every key a session occupies.
    pub const ALL: [&'static str; 3] = [Self::ACCESS_TOKEN, Self::REFRESH_TOKEN, Self::USER_DATA];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_keys_are_unique() {
        let unique: std::collections::HashSet<_> = StorageKeys::ALL.iter().collect();
        assert_eq!(unique.len(), StorageKeys::ALL.len(), "Storage keys must be unique");
    }
}
