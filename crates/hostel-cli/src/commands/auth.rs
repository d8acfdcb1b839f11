//! Authentication commands.

use super::{prompt, Context};
use crate::output::{self, OutputFormat};
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use hostel_auth::{
    AuthError, AuthState, GuardDecision, LoginType, PersistenceMode, RefreshScheduler,
    RouteGuard, UserType,
};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::info;

/// How often keepalive checks whether the session is still there.
const SESSION_CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Login with a roll number or institute email.
pub async fn login(
    ctx: &Context,
    login_type: LoginType,
    identifier: Option<String>,
    remember: bool,
    format: &OutputFormat,
) -> Result<()> {
    if let Some(user) = ctx.manager.current_user() {
        output::print_success(
            &format!(
                "Already logged in as {} ({}). Run 'instasolve logout' first to switch accounts.",
                user.username, user.user_type
            ),
            format,
        );
        return Ok(());
    }

    let identifier = match identifier {
        Some(identifier) => identifier.trim().to_string(),
        None => match login_type {
            LoginType::Student => prompt("Roll number: ")?,
            LoginType::Staff => prompt("Institute email: ")?,
        },
    };

    // Prompt for password (hidden)
    let password = rpassword::prompt_password("Password: ")?;
    login_type.validate(&identifier, &password)?;

    if matches!(format, OutputFormat::Text) {
        println!("Logging in...");
    }

    let mode = PersistenceMode::from_remember_me(remember);
    let session = ctx
        .manager
        .login(&identifier, &password, login_type, mode)
        .await?;

    let Some(user) = session.user() else {
        bail!(AuthError::NotLoggedIn);
    };
    let mut message = format!(
        "Logged in as {} ({}). Dashboard: {}",
        user.username,
        user.user_type,
        user.user_type.dashboard_path()
    );
    if mode == PersistenceMode::Ephemeral {
        message.push_str("\nSession will not be kept after exit; use --remember to stay logged in.");
    }
    output::print_success(&message, format);
    Ok(())
}

/// Logout and clear the stored session.
pub fn logout(ctx: &Context, format: &OutputFormat) -> Result<()> {
    ctx.manager.logout();
    output::print_success("Logged out successfully", format);
    Ok(())
}

#[derive(Serialize)]
struct StatusReport {
    logged_in: bool,
    auth_state: AuthState,
    username: Option<String>,
    user_type: Option<UserType>,
    persistence: Option<PersistenceMode>,
    dashboard: Option<&'static str>,
    established_at: Option<DateTime<Utc>>,
    last_refreshed_at: Option<DateTime<Utc>>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.logged_in {
            return write!(f, "{}", output::row("Auth", "not logged in"));
        }
        writeln!(f, "{}", output::row("Auth", "logged in"))?;
        if let Some(username) = &self.username {
            writeln!(f, "{}", output::row("User", username))?;
        }
        if let Some(user_type) = self.user_type {
            writeln!(f, "{}", output::row("Role", user_type.as_str()))?;
        }
        if let Some(dashboard) = self.dashboard {
            writeln!(f, "{}", output::row("Dashboard", dashboard))?;
        }
        let persistence = match self.persistence {
            Some(PersistenceMode::Durable) => "remembered",
            Some(PersistenceMode::Ephemeral) => "this process only",
            None => "unknown",
        };
        write!(f, "{}", output::row("Storage", persistence))?;
        if let Some(refreshed) = self.last_refreshed_at {
            write!(f, "\n{}", output::row("Refreshed", &refreshed.to_rfc3339()))?;
        }
        Ok(())
    }
}

/// Check authentication status.
pub fn status(ctx: &Context, format: &OutputFormat) -> Result<()> {
    let session = ctx.manager.session();
    let report = StatusReport {
        logged_in: session.is_authenticated(),
        auth_state: ctx.manager.auth_state(),
        username: session.user().map(|u| u.username.clone()),
        user_type: session.user_type(),
        persistence: session.persistence_mode(),
        dashboard: session.user_type().map(|t| t.dashboard_path()),
        established_at: session.established_at(),
        last_refreshed_at: session.last_refreshed_at(),
    };
    output::print(&report, format);
    Ok(())
}

/// Refresh the access token once.
pub async fn refresh(ctx: &Context, format: &OutputFormat) -> Result<()> {
    if !ctx.manager.is_logged_in() {
        bail!(AuthError::NotLoggedIn);
    }
    ctx.manager.refresh().await?;
    if !ctx.manager.is_logged_in() {
        bail!("Session ended while refreshing; log in again");
    }
    output::print_success("Access token refreshed", format);
    Ok(())
}

/// Refresh on a schedule until Ctrl+C or until the session ends.
pub async fn keepalive(
    ctx: &Context,
    interval_secs: Option<u64>,
    format: &OutputFormat,
) -> Result<()> {
    if !ctx.manager.is_logged_in() {
        bail!(AuthError::NotLoggedIn);
    }
    let period = match interval_secs {
        Some(0) => bail!("--interval-secs must be greater than zero"),
        Some(secs) => Duration::from_secs(secs),
        None => ctx.config.refresh_interval(),
    };

    ctx.manager.set_state_callback(Box::new(|payload| {
        info!(state = ?payload.state, username = ?payload.username, "Session state changed");
    }));

    let handle = RefreshScheduler::spawn(ctx.manager.clone(), period);
    output::print_success(
        &format!(
            "Keeping session alive, refreshing every {}s. Press Ctrl+C to stop.",
            period.as_secs()
        ),
        format,
    );

    let mut check = tokio::time::interval(SESSION_CHECK_INTERVAL);
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            _ = check.tick() => {
                if !ctx.manager.is_logged_in() {
                    handle.stop().await;
                    bail!("Session ended; log in again");
                }
            }
        }
    }

    handle.stop().await;
    output::print_success("Keepalive stopped", format);
    Ok(())
}

#[derive(Serialize)]
struct RouteReport {
    path: String,
    decision: GuardDecision,
    redirect: Option<&'static str>,
}

impl fmt::Display for RouteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.redirect {
            None => write!(f, "{}: render", self.path),
            Some(target) => write!(f, "{}: redirect to {}", self.path, target),
        }
    }
}

/// Check whether the current session may open `path`.
pub fn route(ctx: &Context, path: &str, format: &OutputFormat) -> Result<()> {
    let guard = RouteGuard::new(ctx.manager.clone());
    let decision = guard.check_path(path);
    let report = RouteReport {
        path: path.to_string(),
        decision,
        redirect: decision.redirect_target(),
    };
    output::print(&report, format);
    Ok(())
}
