//! Profile and password reset commands.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::{bail, Result};
use hostel_auth::{fetch_profile, AuthError, AuthGateway, PasswordResetClient, UserProfile};
use serde::Serialize;
use std::fmt;

#[derive(Serialize)]
#[serde(transparent)]
struct ProfileReport(UserProfile);

impl fmt::Display for ProfileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let profile = &self.0;
        writeln!(f, "{}", output::row("Name", &profile.display_name()))?;
        write!(f, "{}", output::row("Username", &profile.username))?;
        let optional = [
            ("Email", &profile.email),
            ("Roll number", &profile.roll_number),
            ("Phone", &profile.phone_number),
            ("Photo", &profile.profile_photo),
        ];
        for (label, value) in optional {
            if let Some(value) = value {
                write!(f, "\n{}", output::row(label, value))?;
            }
        }
        Ok(())
    }
}

/// Show the logged-in user's profile.
pub async fn profile(ctx: &Context, format: &OutputFormat) -> Result<()> {
    if !ctx.manager.is_logged_in() {
        bail!(AuthError::NotLoggedIn);
    }
    let gateway = AuthGateway::new(ctx.manager.clone(), ctx.transport.clone());
    let profile = fetch_profile(&gateway).await?;
    output::print(&ProfileReport(profile), format);
    Ok(())
}

/// Email a password reset link.
pub async fn reset_request(ctx: &Context, email_or_roll: &str, format: &OutputFormat) -> Result<()> {
    let client = PasswordResetClient::new(ctx.transport.clone());
    let message = client.request_reset(email_or_roll).await?;
    output::print_success(message, format);
    Ok(())
}

/// Set a new password from a reset link's `uid` and `token`.
pub async fn reset_confirm(
    ctx: &Context,
    uid: &str,
    token: &str,
    format: &OutputFormat,
) -> Result<()> {
    let password = rpassword::prompt_password("New password: ")?;
    let confirm_password = rpassword::prompt_password("Confirm new password: ")?;

    let client = PasswordResetClient::new(ctx.transport.clone());
    let message = client
        .confirm_reset(uid, token, &password, &confirm_password)
        .await?;
    output::print_success(message, format);
    Ok(())
}
