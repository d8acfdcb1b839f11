//! Authentication lifecycle state machine using rust-fsm.
//!
//! The session record is the source of truth for who is logged in. This
//! machine tracks which lifecycle phase the client is in so status output
//! and state-change listeners can observe logins, refreshes and logouts.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐  SessionRestored   ┌─────────────────┐
//! │   NotLoggedIn   │ ─────────────────► │    LoggedIn     │
//! └────────┬────────┘                    └──┬──────────┬───┘
//!          │ LoginAttempt      LoginSuccess │          │ RefreshStarted
//!          ▼                                │          ▼
//! ┌─────────────────┐ ──────────────────────┘  ┌─────────────────┐
//! │   LoggingIn     │                          │   Refreshing    │
//! └────────┬────────┘                          └────────┬────────┘
//!          │ LoginFailed                                │ RefreshSuccess ──► LoggedIn
//!          ▼                                            │ RefreshFailed
//!     NotLoggedIn                                       ▼
//!                      LogoutRequested         ┌─────────────────┐
//!              (from any state) ─────────────► │   LoggingOut    │
//!                                              └────────┬────────┘
//!                                                       │ LogoutComplete
//!                                                       ▼
//!                                                  NotLoggedIn
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

use hostel_credential_store::UserType;

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub auth_machine(NotLoggedIn)

    NotLoggedIn => {
        LoginAttempt => LoggingIn,
        // Credentials found in the store at startup
        SessionRestored => LoggedIn,
        // Logout is idempotent and always runs its full cycle
        LogoutRequested => LoggingOut
    },
    LoggingIn => {
        LoginSuccess => LoggedIn,
        LoginFailed => NotLoggedIn,
        // A re-login failed but the earlier session is still in place
        LoginFailedWithSession => LoggedIn,
        LogoutRequested => LoggingOut
    },
    LoggedIn => {
        LoginAttempt => LoggingIn,
        RefreshStarted => Refreshing,
        LogoutRequested => LoggingOut
    },
    Refreshing => {
        RefreshSuccess => LoggedIn,
        // A failed refresh always ends the session
        RefreshFailed => LoggingOut,
        LoginAttempt => LoggingIn,
        LogoutRequested => LoggingOut
    },
    LoggingOut => {
        LogoutComplete => NotLoggedIn,
        LoginAttempt => LoggingIn
    }
}

pub use auth_machine::Input as AuthMachineInput;
pub use auth_machine::State as AuthMachineState;
pub use auth_machine::StateMachine as AuthMachine;

/// User-facing authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// Not logged in.
    NotLoggedIn,
    /// Credentials submitted, waiting for the server.
    LoggingIn,
    /// Logged in with a session.
    LoggedIn,
    /// Exchanging the refresh token for a new access token.
    Refreshing,
    /// Clearing the session.
    LoggingOut,
}

impl AuthState {
    /// Returns true if the user has a usable session (LoggedIn state only).
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::LoggedIn)
    }

    /// Returns true if the state is an in-progress state.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AuthState::LoggingIn | AuthState::Refreshing | AuthState::LoggingOut
        )
    }
}

impl From<&AuthMachineState> for AuthState {
    fn from(state: &AuthMachineState) -> Self {
        match state {
            AuthMachineState::NotLoggedIn => AuthState::NotLoggedIn,
            AuthMachineState::LoggingIn => AuthState::LoggingIn,
            AuthMachineState::LoggedIn => AuthState::LoggedIn,
            AuthMachineState::Refreshing => AuthState::Refreshing,
            AuthMachineState::LoggingOut => AuthState::LoggingOut,
        }
    }
}

/// Payload for auth state change events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStateChangedPayload {
    /// Current auth state.
    pub state: AuthState,
    /// Username if a session is present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Role if a session is present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_type: Option<UserType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_not_logged_in() {
        let machine = AuthMachine::new();
        assert_eq!(*machine.state(), AuthMachineState::NotLoggedIn);
    }

    #[test]
    fn test_login_flow() {
        let mut machine = AuthMachine::new();

        machine.consume(&AuthMachineInput::LoginAttempt).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::LoggingIn);

        machine.consume(&AuthMachineInput::LoginSuccess).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::LoggedIn);
    }

    #[test]
    fn test_login_failure_returns_to_not_logged_in() {
        let mut machine = AuthMachine::new();

        machine.consume(&AuthMachineInput::LoginAttempt).unwrap();
        machine.consume(&AuthMachineInput::LoginFailed).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::NotLoggedIn);
    }

    #[test]
    fn test_failed_relogin_keeps_existing_session() {
        let mut machine = AuthMachine::new();

        machine.consume(&AuthMachineInput::SessionRestored).unwrap();
        machine.consume(&AuthMachineInput::LoginAttempt).unwrap();
        machine
            .consume(&AuthMachineInput::LoginFailedWithSession)
            .unwrap();
        assert_eq!(*machine.state(), AuthMachineState::LoggedIn);
    }

    #[test]
    fn test_refresh_success_returns_to_logged_in() {
        let mut machine = AuthMachine::new();

        machine.consume(&AuthMachineInput::SessionRestored).unwrap();
        machine.consume(&AuthMachineInput::RefreshStarted).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::Refreshing);

        machine.consume(&AuthMachineInput::RefreshSuccess).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::LoggedIn);
    }

    #[test]
    fn test_refresh_failure_logs_out() {
        let mut machine = AuthMachine::new();

        machine.consume(&AuthMachineInput::SessionRestored).unwrap();
        machine.consume(&AuthMachineInput::RefreshStarted).unwrap();
        machine.consume(&AuthMachineInput::RefreshFailed).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::LoggingOut);

        machine.consume(&AuthMachineInput::LogoutComplete).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::NotLoggedIn);
    }

    #[test]
    fn test_logout_from_any_resting_state() {
        for setup in [
            vec![],
            vec![AuthMachineInput::SessionRestored],
            vec![AuthMachineInput::LoginAttempt],
            vec![
                AuthMachineInput::SessionRestored,
                AuthMachineInput::RefreshStarted,
            ],
        ] {
            let mut machine = AuthMachine::new();
            for input in &setup {
                machine.consume(input).unwrap();
            }

            machine.consume(&AuthMachineInput::LogoutRequested).unwrap();
            machine.consume(&AuthMachineInput::LogoutComplete).unwrap();
            assert_eq!(*machine.state(), AuthMachineState::NotLoggedIn);
        }
    }

    #[test]
    fn test_invalid_transition_returns_error() {
        let mut machine = AuthMachine::new();

        assert!(machine.consume(&AuthMachineInput::LoginSuccess).is_err());
        assert!(machine.consume(&AuthMachineInput::RefreshStarted).is_err());
        assert_eq!(*machine.state(), AuthMachineState::NotLoggedIn);
    }

    #[test]
    fn test_auth_state_conversion() {
        assert_eq!(
            AuthState::from(&AuthMachineState::NotLoggedIn),
            AuthState::NotLoggedIn
        );
        assert_eq!(
            AuthState::from(&AuthMachineState::LoggingIn),
            AuthState::LoggingIn
        );
        assert_eq!(
            AuthState::from(&AuthMachineState::LoggedIn),
            AuthState::LoggedIn
        );
        assert_eq!(
            AuthState::from(&AuthMachineState::Refreshing),
            AuthState::Refreshing
        );
        assert_eq!(
            AuthState::from(&AuthMachineState::LoggingOut),
            AuthState::LoggingOut
        );
    }

    #[test]
    fn test_auth_state_flags() {
        assert!(AuthState::LoggedIn.is_authenticated());
        assert!(!AuthState::Refreshing.is_authenticated());
        assert!(!AuthState::NotLoggedIn.is_transient());
        assert!(!AuthState::LoggedIn.is_transient());
        assert!(AuthState::LoggingIn.is_transient());
        assert!(AuthState::Refreshing.is_transient());
        assert!(AuthState::LoggingOut.is_transient());
    }
}
