//! Authenticated request path to the backend.
//!
//! Every request goes out with the session's current access token. A 401 is
//! handed to the [`RetryPolicy`]; depending on its decision the gateway
//! refreshes and resends once, resends once with a token someone else
//! already refreshed, or returns the 401.

use crate::retry_policy::{RetryDecision, RetryPolicy, UnauthorizedContext};
use crate::session::SessionManager;
use crate::transport::{ApiResponse, HttpTransport, OutgoingRequest};
use crate::AuthResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

pub struct AuthGateway {
    manager: Arc<SessionManager>,
    transport: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
}

impl AuthGateway {
    pub fn new(manager: Arc<SessionManager>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            manager,
            transport,
            policy: RetryPolicy::new(),
        }
    }

    pub fn session_manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    /// Send `request` with the current bearer token.
    ///
    /// Returns the 2xx response, or `AuthError::HttpStatus` for any other
    /// final status.
    pub async fn send(&self, request: OutgoingRequest) -> AuthResult<ApiResponse> {
        let span = info_span!(
            "api_request",
            request_id = %Uuid::new_v4(),
            method = ?request.method,
            path = %request.path
        );
        self.send_with_retry(request).instrument(span).await
    }

    async fn send_with_retry(&self, request: OutgoingRequest) -> AuthResult<ApiResponse> {
        let (mut bearer, sent_generation) = self.manager.access_token_with_generation();
        let mut already_retried = false;

        let response = loop {
            let response = self
                .transport
                .execute(request.clone().with_bearer(bearer.clone()))
                .await?;
            if !response.is_unauthorized() {
                break response;
            }

            let (current_token, current_generation) = self.manager.access_token_with_generation();
            let decision = self.policy.on_unauthorized(&UnauthorizedContext {
                path: &request.path,
                already_retried,
                sent_token: bearer.as_deref(),
                current_token: current_token.as_deref(),
                sent_generation,
                current_generation,
            });
            debug!(decision = ?decision, already_retried, "Request unauthorized");

            let next_bearer = match decision {
                RetryDecision::GiveUp => None,
                RetryDecision::RetryWithCurrentToken => Some(current_token),
                RetryDecision::RefreshThenRetry => match self.manager.refresh().await {
                    Ok(()) => {
                        let (fresh_token, fresh_generation) =
                            self.manager.access_token_with_generation();
                        (fresh_token.is_some() && fresh_generation == sent_generation)
                            .then_some(fresh_token)
                    }
                    Err(e) => {
                        debug!(error = %e, "Refresh after 401 failed, returning original response");
                        None
                    }
                },
            };

            match next_bearer {
                Some(token) => {
                    bearer = token;
                    already_retried = true;
                }
                None => break response,
            }
        };

        if response.is_success() {
            Ok(response)
        } else {
            let fallback = format!("Request failed with status {}", response.status);
            Err(response.into_status_error(&fallback))
        }
    }

    /// GET `path` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> AuthResult<T> {
        self.send(OutgoingRequest::get(path)).await?.json()
    }

    /// POST `body` to `path` and decode the JSON reply.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> AuthResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.send(OutgoingRequest::post(path, body)).await?.json()
    }
}
