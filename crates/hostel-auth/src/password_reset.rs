//! Password reset requests. These never touch the session.

use crate::endpoints::{self, PasswordResetConfirm, PasswordResetRequest};
use crate::login_form::{is_institute_email, is_roll_number};
use crate::transport::{HttpTransport, OutgoingRequest};
use crate::{AuthError, AuthResult};
use std::sync::Arc;
use tracing::{info, warn};

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub const RESET_EMAIL_SENT: &str = "Password reset email sent. Please check your email inbox.";
pub const PASSWORD_RESET_DONE: &str =
    "Password reset successfully! You can now login with your new password.";

const SEND_FAILED: &str = "Failed to send reset email";
const RESET_FAILED: &str = "Failed to reset password";

pub struct PasswordResetClient {
    transport: Arc<dyn HttpTransport>,
}

impl PasswordResetClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Ask the backend to mail a reset link for an institute email or a
    /// roll number.
    pub async fn request_reset(&self, email_or_roll: &str) -> AuthResult<&'static str> {
        let email_or_roll = email_or_roll.trim();
        if !is_institute_email(email_or_roll) && !is_roll_number(email_or_roll) {
            return Err(AuthError::Validation(
                "Enter your @iiitkottayam.ac.in email or roll number".to_string(),
            ));
        }

        let body = serde_json::to_value(PasswordResetRequest { email_or_roll })?;
        let response = self
            .transport
            .execute(OutgoingRequest::post(endpoints::PASSWORD_RESET, body))
            .await?;

        if !response.is_success() {
            warn!(status = response.status, "Password reset request rejected");
            return Err(response.into_status_error(SEND_FAILED));
        }

        info!("Password reset email requested");
        Ok(RESET_EMAIL_SENT)
    }

    /// Set a new password using the `uid` and `token` from the reset link.
    pub async fn confirm_reset(
        &self,
        uid: &str,
        token: &str,
        password: &str,
        confirm_password: &str,
    ) -> AuthResult<&'static str> {
        if password != confirm_password {
            return Err(AuthError::Validation("Passwords don't match".to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        if uid.is_empty() || token.is_empty() {
            return Err(AuthError::Validation(
                "Reset link is missing its uid or token".to_string(),
            ));
        }

        let body = serde_json::to_value(PasswordResetConfirm {
            uid,
            token,
            password,
            confirm_password,
        })?;
        let response = self
            .transport
            .execute(OutgoingRequest::post(endpoints::PASSWORD_RESET_CONFIRM, body))
            .await?;

        if !response.is_success() {
            warn!(status = response.status, "Password reset confirmation rejected");
            return Err(response.into_status_error(RESET_FAILED));
        }

        info!("Password reset confirmed");
        Ok(PASSWORD_RESET_DONE)
    }
}
