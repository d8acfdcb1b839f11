//! Authentication error types.

use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Bad identifier or password; shown inline on the login form
    #[error("{0}")]
    InvalidCredentials(String),

    /// The backend answered 2xx but broke the response contract
    #[error("Malformed response from server: {0}")]
    MalformedResponse(String),

    /// Transport-level failure (timeout, DNS, connection refused, offline)
    #[error("Network error: {0}")]
    Network(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] hostel_credential_store::StorageError),

    /// Token refresh was rejected; the session has been cleared
    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    /// Non-success HTTP status passed through to the caller
    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// Input rejected before any request was sent
    #[error("{0}")]
    Validation(String),

    /// Session not found
    #[error("Not logged in")]
    NotLoggedIn,

    /// A logout landed while the operation was in flight; its result was dropped
    #[error("Operation superseded by logout")]
    Superseded,

    /// Invalid state transition in the auth FSM
    #[error("Invalid auth state transition: {0}")]
    InvalidStateTransition(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Returns true if the user can reasonably retry the same action.
    pub fn is_retryable(&self) -> bool {
        match self {
            AuthError::Network(_) => true,
            AuthError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true for a 401 passed through by the gateway.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::Network(e.to_string())
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
