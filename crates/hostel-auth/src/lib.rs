//! Session lifecycle and route authorization for the InstaSolve client.
//!
//! This crate provides:
//! - `SessionManager`: login, token refresh and logout over a write-through
//!   credential store, with an FSM tracking the lifecycle phase
//! - `AuthGateway`: bearer-token requests with a single refresh-and-retry on 401
//! - `RouteGuard`: synchronous role checks for protected routes
//! - `RefreshScheduler`: periodic background refresh
//! - Password reset and current-user profile calls

mod auth_fsm;
pub mod endpoints;
mod error;
mod gateway;
mod login_form;
mod password_reset;
mod profile;
mod refresh_scheduler;
mod retry_policy;
mod route_guard;
mod session;
mod transport;

#[cfg(test)]
mod testing;

pub use auth_fsm::auth_machine;
pub use auth_fsm::{
    AuthMachine, AuthMachineInput, AuthMachineState, AuthState, AuthStateChangedPayload,
};
pub use error::{AuthError, AuthResult};
pub use gateway::AuthGateway;
pub use login_form::{is_institute_email, is_roll_number, LoginType, INSTITUTE_EMAIL_DOMAIN};
pub use password_reset::{
    PasswordResetClient, MIN_PASSWORD_LENGTH, PASSWORD_RESET_DONE, RESET_EMAIL_SENT,
};
pub use profile::{fetch_profile, UserProfile};
pub use refresh_scheduler::{RefreshScheduler, RefreshSchedulerHandle};
pub use retry_policy::{RetryDecision, RetryPolicy, UnauthorizedContext};
pub use route_guard::{GuardDecision, RouteGuard, LOGIN_PATH, PROTECTED_ROUTES, PUBLIC_ROUTES};
pub use session::{AuthStateCallback, Session, SessionManager};
pub use transport::{ApiResponse, HttpMethod, HttpTransport, OutgoingRequest, ReqwestTransport};

pub use hostel_credential_store::{PersistenceMode, UserRecord, UserType};
