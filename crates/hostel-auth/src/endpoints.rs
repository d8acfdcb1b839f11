//! Backend endpoint paths and wire payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const LOGIN: &str = "auth/login/";
pub const TOKEN_REFRESH: &str = "auth/token/refresh/";
pub const PASSWORD_RESET: &str = "auth/password_reset/";
pub const PASSWORD_RESET_CONFIRM: &str = "auth/password_reset/confirm/";
pub const CURRENT_USER: &str = "users/me/";

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub login_type: &'a str,
    pub identifier: &'a str,
    pub password: &'a str,
}

/// Required fields are optional here so a missing one surfaces as a
/// malformed response rather than a decode error.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub user_type: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roll_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefreshResponse {
    #[serde(default)]
    pub access: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PasswordResetRequest<'a> {
    pub email_or_roll: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct PasswordResetConfirm<'a> {
    pub uid: &'a str,
    pub token: &'a str,
    pub password: &'a str,
    pub confirm_password: &'a str,
}

/// First non-empty string among the body's `detail`, `message` and `error`.
pub fn error_message(body: Option<&Value>) -> Option<String> {
    let body = body?;
    ["detail", "message", "error"]
        .iter()
        .filter_map(|key| body.get(key).and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}
