//! Decides what the gateway does with a 401.

use crate::endpoints;

/// What to do after a request came back unauthorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Refresh the access token, then resend once.
    RefreshThenRetry,
    /// Another caller already refreshed; resend once with the current token.
    RetryWithCurrentToken,
    /// Return the 401 to the caller.
    GiveUp,
}

/// Facts about an unauthorized request.
#[derive(Debug, Clone, Copy)]
pub struct UnauthorizedContext<'a> {
    pub path: &'a str,
    /// Whether this response already came from the single retry.
    pub already_retried: bool,
    /// Token the request carried.
    pub sent_token: Option<&'a str>,
    /// Token the session holds now.
    pub current_token: Option<&'a str>,
    /// Session generation when the request was sent.
    pub sent_generation: u64,
    pub current_generation: u64,
}

/// At most one retry per request, never for the refresh call itself, and
/// never across a login or logout.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryPolicy;

impl RetryPolicy {
    pub fn new() -> Self {
        Self
    }

    pub fn on_unauthorized(&self, ctx: &UnauthorizedContext<'_>) -> RetryDecision {
        if ctx.already_retried || is_refresh_path(ctx.path) {
            return RetryDecision::GiveUp;
        }
        if ctx.sent_generation != ctx.current_generation {
            return RetryDecision::GiveUp;
        }
        match ctx.current_token {
            None => RetryDecision::GiveUp,
            Some(current) if ctx.sent_token != Some(current) => {
                RetryDecision::RetryWithCurrentToken
            }
            Some(_) => RetryDecision::RefreshThenRetry,
        }
    }
}

fn is_refresh_path(path: &str) -> bool {
    path.trim_start_matches('/') == endpoints::TOKEN_REFRESH
}
