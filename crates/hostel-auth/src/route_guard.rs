//! Role-based gate in front of protected views.
//!
//! The guard only reads the in-memory session: it never performs I/O and
//! never fails. Anything it cannot authorize becomes a redirect to login.

use crate::session::SessionManager;
use hostel_credential_store::UserType;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Route of the login page.
pub const LOGIN_PATH: &str = "/";

/// Routes anyone may open.
pub const PUBLIC_ROUTES: &[&str] = &["/", "/passwordreset", "/reset"];

/// Protected routes and the single role allowed on each.
pub const PROTECTED_ROUTES: &[(&str, UserType)] = &[
    ("/SDash", UserType::Student),
    ("/SProfile", UserType::Student),
    ("/Wmain", UserType::Warden),
    ("/WProfile", UserType::Warden),
    ("/HDash", UserType::HostelStaff),
    ("/hostel", UserType::HostelStaff),
    ("/PDash", UserType::Worker),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardDecision {
    Render,
    RedirectLogin,
}

impl GuardDecision {
    pub fn redirect_target(&self) -> Option<&'static str> {
        match self {
            GuardDecision::Render => None,
            GuardDecision::RedirectLogin => Some(LOGIN_PATH),
        }
    }
}

pub struct RouteGuard {
    manager: Arc<SessionManager>,
}

impl RouteGuard {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    /// Render when the session's role is in `allowed_roles`.
    pub fn check(&self, allowed_roles: &[UserType]) -> GuardDecision {
        match self.manager.current_role() {
            Some(role) if allowed_roles.contains(&role) => GuardDecision::Render,
            Some(role) => {
                debug!(role = %role, allowed = ?allowed_roles, "Role not allowed, redirecting to login");
                GuardDecision::RedirectLogin
            }
            None => {
                debug!("No session, redirecting to login");
                GuardDecision::RedirectLogin
            }
        }
    }

    /// Decide for a concrete application path.
    pub fn check_path(&self, path: &str) -> GuardDecision {
        match route_access(path) {
            RouteAccess::Public => GuardDecision::Render,
            RouteAccess::Role(role) => self.check(&[role]),
            RouteAccess::Unknown => {
                debug!(path, "Unknown route, redirecting to login");
                GuardDecision::RedirectLogin
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteAccess {
    Public,
    Role(UserType),
    Unknown,
}

fn route_access(path: &str) -> RouteAccess {
    let path = normalize(path);
    if PUBLIC_ROUTES.iter().any(|route| route.eq_ignore_ascii_case(path)) {
        return RouteAccess::Public;
    }
    PROTECTED_ROUTES
        .iter()
        .find(|(route, _)| route.eq_ignore_ascii_case(path))
        .map_or(RouteAccess::Unknown, |(_, role)| RouteAccess::Role(*role))
}

/// Drop query, fragment and trailing slash; `""` becomes `/`.
fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use crate::transport::ApiResponse;
    use hostel_credential_store::{CredentialStore, MemoryStorage, PersistenceMode, UserRecord};

    fn guard_for(role: Option<UserType>) -> RouteGuard {
        let store = CredentialStore::new(
            Box::new(MemoryStorage::new()),
            Box::new(MemoryStorage::new()),
        );
        if let Some(user_type) = role {
            let user = UserRecord {
                username: "someone".to_string(),
                user_type,
                email: None,
                roll_number: None,
            };
            store
                .write(PersistenceMode::Durable, "A1", "R1", &user)
                .unwrap();
        }
        let transport = ScriptedTransport::new(|_| Ok(ApiResponse::new(500, None)));
        RouteGuard::new(Arc::new(SessionManager::new(store, transport).unwrap()))
    }

    #[test]
    fn test_check_allowed_roles() {
        let guard = guard_for(Some(UserType::Worker));
        assert_eq!(
            guard.check(&[UserType::Worker, UserType::Warden]),
            GuardDecision::Render
        );
        assert_eq!(guard.check(&[UserType::Student]), GuardDecision::RedirectLogin);
        assert_eq!(guard.check(&[]), GuardDecision::RedirectLogin);
    }

    #[test]
    fn test_no_session_redirects() {
        let guard = guard_for(None);
        for role in UserType::ALL {
            assert_eq!(guard.check(&[role]), GuardDecision::RedirectLogin);
        }
        assert_eq!(guard.check_path("/SDash"), GuardDecision::RedirectLogin);
    }

    #[test]
    fn test_each_role_reaches_its_dashboard_only() {
        for role in UserType::ALL {
            let guard = guard_for(Some(role));
            for other in UserType::ALL {
                let expected = if other == role {
                    GuardDecision::Render
                } else {
                    GuardDecision::RedirectLogin
                };
                assert_eq!(guard.check_path(other.dashboard_path()), expected);
            }
        }
    }

    #[test]
    fn test_public_routes_render_for_everyone() {
        for role in [None, Some(UserType::Student)] {
            let guard = guard_for(role);
            for path in ["/", "", "/passwordreset", "/Passwordreset", "/reset?uid=1&token=t"] {
                assert_eq!(guard.check_path(path), GuardDecision::Render, "{}", path);
            }
        }
    }

    #[test]
    fn test_path_matching_is_case_insensitive() {
        let guard = guard_for(Some(UserType::HostelStaff));
        assert_eq!(guard.check_path("/hdash"), GuardDecision::Render);
        assert_eq!(guard.check_path("/Hostel/"), GuardDecision::Render);
        assert_eq!(guard.check_path("/wprofile"), GuardDecision::RedirectLogin);
    }

    #[test]
    fn test_unknown_route_redirects() {
        let guard = guard_for(Some(UserType::Student));
        assert_eq!(guard.check_path("/admin"), GuardDecision::RedirectLogin);
        assert_eq!(
            GuardDecision::RedirectLogin.redirect_target(),
            Some(LOGIN_PATH)
        );
        assert_eq!(GuardDecision::Render.redirect_target(), None);
    }
}
