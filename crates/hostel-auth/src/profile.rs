//! Profile of the logged-in user.

use crate::endpoints;
use crate::gateway::AuthGateway;
use crate::AuthResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roll_number: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    /// URL of the uploaded photo.
    #[serde(default)]
    pub profile_photo: Option<String>,
}

impl UserProfile {
    /// "First Last", or the username when neither name is set.
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() {
            self.username.clone()
        } else {
            parts.join(" ")
        }
    }
}

/// GET the current user's profile through the authenticated gateway.
pub async fn fetch_profile(gateway: &AuthGateway) -> AuthResult<UserProfile> {
    gateway.get_json(endpoints::CURRENT_USER).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionManager;
    use crate::testing::ScriptedTransport;
    use crate::transport::ApiResponse;
    use crate::AuthError;
    use hostel_credential_store::{
        CredentialStore, MemoryStorage, PersistenceMode, UserRecord, UserType,
    };
    use serde_json::json;
    use std::sync::Arc;

    fn gateway(transport: Arc<ScriptedTransport>) -> AuthGateway {
        let store = CredentialStore::new(
            Box::new(MemoryStorage::new()),
            Box::new(MemoryStorage::new()),
        );
        let user = UserRecord {
            username: "2023bcy1234".to_string(),
            user_type: UserType::Student,
            email: None,
            roll_number: Some("2023bcy1234".to_string()),
        };
        store
            .write(PersistenceMode::Durable, "A1", "R1", &user)
            .unwrap();
        let manager = Arc::new(SessionManager::new(store, transport.clone()).unwrap());
        AuthGateway::new(manager, transport)
    }

    #[tokio::test]
    async fn test_fetch_profile() {
        let transport = ScriptedTransport::new(|_| {
            Ok(ApiResponse::new(
                200,
                Some(json!({
                    "username": "2023bcy1234",
                    "email": "2023bcy1234@iiitkottayam.ac.in",
                    "roll_number": "2023bcy1234",
                    "first_name": "Asha",
                    "last_name": "Menon",
                    "phone_number": null,
                    "profile_photo": null
                })),
            ))
        });

        let profile = fetch_profile(&gateway(transport.clone())).await.unwrap();
        assert_eq!(profile.display_name(), "Asha Menon");
        assert_eq!(profile.phone_number, None);

        let request = &transport.requests()[0];
        assert_eq!(request.path, endpoints::CURRENT_USER);
        assert_eq!(request.bearer.as_deref(), Some("A1"));
    }

    #[tokio::test]
    async fn test_fetch_profile_bad_body() {
        let transport =
            ScriptedTransport::new(|_| Ok(ApiResponse::new(200, Some(json!({ "id": 7 })))));
        assert!(matches!(
            fetch_profile(&gateway(transport)).await,
            Err(AuthError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let profile = UserProfile {
            username: "warden1".to_string(),
            email: None,
            roll_number: None,
            first_name: Some(" ".to_string()),
            last_name: None,
            phone_number: None,
            profile_photo: None,
        };
        assert_eq!(profile.display_name(), "warden1");
    }
}
