//! HTTP transport seam between the session core and the backend.

use crate::endpoints;
use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use hostel_config_and_utils::Config;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A request relative to the API root.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingRequest {
    pub method: HttpMethod,
    /// Endpoint path relative to the API root, e.g. `auth/login/`.
    pub path: String,
    pub body: Option<Value>,
    /// Access token sent as `Authorization: Bearer <token>`.
    pub bearer: Option<String>,
}

impl OutgoingRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            body: None,
            bearer: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            body: Some(body),
            bearer: None,
        }
    }

    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }
}

/// Status and decoded body of a completed exchange.
///
/// `body` is `None` when the response was empty or not JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl ApiResponse {
    pub fn new(status: u16, body: Option<Value>) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Decode the body, treating a missing or mismatched body as a broken
    /// response contract.
    pub fn json<T: DeserializeOwned>(&self) -> AuthResult<T> {
        let body = self
            .body
            .clone()
            .ok_or_else(|| AuthError::MalformedResponse("response body is not JSON".to_string()))?;
        serde_json::from_value(body).map_err(|e| AuthError::MalformedResponse(e.to_string()))
    }

    /// Server-supplied error text from `detail`, `message` or `error`.
    pub fn error_message(&self) -> Option<String> {
        endpoints::error_message(self.body.as_ref())
    }

    /// Convert a non-2xx response into [`AuthError::HttpStatus`].
    pub fn into_status_error(self, fallback: &str) -> AuthError {
        let message = self
            .error_message()
            .unwrap_or_else(|| fallback.to_string());
        AuthError::HttpStatus {
            status: self.status,
            message,
        }
    }
}

/// Executes requests against the backend.
///
/// Any HTTP status is a successful exchange; only transport failures
/// (timeouts, refused connections, DNS) are errors.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: OutgoingRequest) -> AuthResult<ApiResponse>;
}

/// Production transport backed by a shared `reqwest::Client`.
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
}

impl ReqwestTransport {
    pub fn new(base_url: Url, timeout: Duration) -> AuthResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// Build from the API root and request timeout in `config`.
    pub fn from_config(config: &Config) -> AuthResult<Self> {
        let base_url = config
            .api_base_url()
            .map_err(|e| AuthError::Config(e.to_string()))?;
        Self::new(base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: OutgoingRequest) -> AuthResult<ApiResponse> {
        let url = self.base_url.join(request.path.trim_start_matches('/'))?;

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(url.clone()),
            HttpMethod::Post => self.client.post(url.clone()),
        };
        if let Some(token) = &request.bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let body = serde_json::from_slice::<Value>(&bytes).ok();

        debug!(url = %url, status, "HTTP exchange complete");
        Ok(ApiResponse { status, body })
    }
}
