//! Session management: login, token refresh and logout.
//!
//! `SessionManager` owns the single in-memory session of the process and
//! mirrors every change into the [`CredentialStore`] before the change
//! becomes visible. An auth FSM runs alongside it so callers can observe
//! transient phases (logging in, refreshing, logging out); the session record
//! stays the source of truth.
//!
//! Every identity change (login commit, logout) bumps a generation counter.
//! Login and refresh capture the generation before they go to the network and
//! drop their result if it moved in the meantime.

use crate::auth_fsm::{AuthMachine, AuthMachineInput, AuthState, AuthStateChangedPayload};
use crate::endpoints::{self, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse};
use crate::login_form::LoginType;
use crate::transport::{HttpTransport, OutgoingRequest};
use crate::{AuthError, AuthResult};
use chrono::{DateTime, Utc};
use hostel_credential_store::{
    CredentialStore, PersistenceMode, StorageError, StoredCredentials, UserRecord, UserType,
};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Callback type for auth state change notifications.
pub type AuthStateCallback = Box<dyn Fn(AuthStateChangedPayload) + Send + Sync>;

/// Snapshot of who is logged in.
///
/// Either fully empty or fully authenticated: an access token never exists
/// without a user and vice versa. The refresh token is never part of it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    active: Option<ActiveSession>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveSession {
    access_token: String,
    user: UserRecord,
    persistence_mode: PersistenceMode,
    established_at: DateTime<Utc>,
    last_refreshed_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn empty() -> Self {
        Self { active: None }
    }

    pub(crate) fn authenticated(
        access_token: String,
        user: UserRecord,
        persistence_mode: PersistenceMode,
        established_at: DateTime<Utc>,
    ) -> Self {
        Self {
            active: Some(ActiveSession {
                access_token,
                user,
                persistence_mode,
                established_at,
                last_refreshed_at: None,
            }),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.active.is_some()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.access_token.as_str())
    }

    pub fn user(&self) -> Option<&UserRecord> {
        self.active.as_ref().map(|a| &a.user)
    }

    pub fn user_type(&self) -> Option<UserType> {
        self.active.as_ref().map(|a| a.user.user_type)
    }

    pub fn persistence_mode(&self) -> Option<PersistenceMode> {
        self.active.as_ref().map(|a| a.persistence_mode)
    }

    /// When this process logged in or restored the session.
    pub fn established_at(&self) -> Option<DateTime<Utc>> {
        self.active.as_ref().map(|a| a.established_at)
    }

    pub fn last_refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.active.as_ref().and_then(|a| a.last_refreshed_at)
    }

    fn replace_access_token(&mut self, access_token: String, at: DateTime<Utc>) {
        if let Some(active) = self.active.as_mut() {
            active.access_token = access_token;
            active.last_refreshed_at = Some(at);
        }
    }
}

struct SessionState {
    session: Session,
    refresh_token: Option<String>,
    generation: u64,
}

impl SessionState {
    fn empty() -> Self {
        Self {
            session: Session::empty(),
            refresh_token: None,
            generation: 0,
        }
    }

    fn restored(credentials: StoredCredentials) -> Self {
        Self {
            session: Session::authenticated(
                credentials.access_token,
                credentials.user,
                credentials.mode,
                Utc::now(),
            ),
            refresh_token: Some(credentials.refresh_token),
            generation: 0,
        }
    }
}

/// How a refresh attempt ended, shared with callers that joined it.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RefreshOutcome {
    Refreshed,
    NoSession,
    /// The session changed while the request was in flight.
    Discarded,
    Failed(String),
}

impl RefreshOutcome {
    fn into_result(self) -> AuthResult<()> {
        match self {
            RefreshOutcome::Failed(message) => Err(AuthError::TokenRefresh(message)),
            _ => Ok(()),
        }
    }
}

/// Attempt numbers: `started == finished` when idle, `finished + 1` while
/// an attempt runs.
#[derive(Debug, Default)]
struct RefreshLedger {
    started: u64,
    finished: u64,
    last: Option<RefreshOutcome>,
}

/// Owns the process-wide session.
pub struct SessionManager {
    store: CredentialStore,
    transport: Arc<dyn HttpTransport>,
    state: Mutex<SessionState>,
    /// Internal FSM for tracking auth state transitions.
    fsm: Mutex<AuthMachine>,
    state_callback: Mutex<Option<AuthStateCallback>>,
    /// Held for the whole of a refresh attempt.
    refresh_gate: tokio::sync::Mutex<()>,
    refresh_ledger: Mutex<RefreshLedger>,
}

impl SessionManager {
    /// Create the manager, restoring any session found in `store`.
    ///
    /// A stored user record that cannot be decoded is discarded and the
    /// store cleared; other storage failures are returned.
    pub fn new(store: CredentialStore, transport: Arc<dyn HttpTransport>) -> AuthResult<Self> {
        let mut fsm = AuthMachine::new();

        let state = match store.read() {
            Ok(Some(credentials)) => {
                info!(
                    username = %credentials.user.username,
                    user_type = %credentials.user.user_type,
                    mode = ?credentials.mode,
                    "Restored session from credential store"
                );
                fsm.consume(&AuthMachineInput::SessionRestored)
                    .map_err(|_| {
                        AuthError::InvalidStateTransition(
                            "Cannot restore session in initial state".to_string(),
                        )
                    })?;
                SessionState::restored(credentials)
            }
            Ok(None) => {
                debug!("No stored session");
                SessionState::empty()
            }
            Err(StorageError::Encoding(e)) => {
                warn!(error = %e, "Stored credentials are unreadable, clearing them");
                store.clear()?;
                SessionState::empty()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            store,
            transport,
            state: Mutex::new(state),
            fsm: Mutex::new(fsm),
            state_callback: Mutex::new(None),
            refresh_gate: tokio::sync::Mutex::new(()),
            refresh_ledger: Mutex::new(RefreshLedger::default()),
        })
    }

    /// Set a callback to be notified of auth state changes.
    pub fn set_state_callback(&self, callback: AuthStateCallback) {
        let mut cb = self.state_callback.lock().unwrap();
        *cb = Some(callback);
    }

    /// Get the current FSM state.
    pub fn auth_state(&self) -> AuthState {
        let fsm = self.fsm.lock().unwrap();
        AuthState::from(fsm.state())
    }

    /// Transition the FSM and notify callback if state changed.
    fn transition(&self, input: &AuthMachineInput) -> AuthResult<AuthState> {
        let mut fsm = self.fsm.lock().unwrap();
        let old_state = AuthState::from(fsm.state());

        fsm.consume(input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                fsm.state()
            ))
        })?;

        let new_state = AuthState::from(fsm.state());
        drop(fsm);

        if old_state != new_state {
            debug!(
                old_state = ?old_state,
                new_state = ?new_state,
                "Auth state transition"
            );
            self.notify_state_change(new_state);
        }

        Ok(new_state)
    }

    /// Best-effort transition. Concurrent operations can leave the machine
    /// in a state where `input` no longer applies; that is logged, not fatal.
    fn advance(&self, input: &AuthMachineInput) {
        if let Err(e) = self.transition(input) {
            debug!(error = %e, "Skipped auth state transition");
        }
    }

    fn notify_state_change(&self, state: AuthState) {
        let session = self.session();
        let payload = AuthStateChangedPayload {
            state,
            username: session.user().map(|u| u.username.clone()),
            user_type: session.user_type(),
        };

        let cb = self.state_callback.lock().unwrap();
        if let Some(callback) = cb.as_ref() {
            callback(payload);
        }
    }

    /// Current session snapshot.
    pub fn session(&self) -> Session {
        self.state.lock().unwrap().session.clone()
    }

    pub fn current_user(&self) -> Option<UserRecord> {
        self.state.lock().unwrap().session.user().cloned()
    }

    pub fn current_role(&self) -> Option<UserType> {
        self.state.lock().unwrap().session.user_type()
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.lock().unwrap().session.is_authenticated()
    }

    /// Number of identity changes (logins and logouts) so far.
    pub fn generation(&self) -> u64 {
        self.state.lock().unwrap().generation
    }

    /// Access token and generation read together, for attaching to a request.
    pub fn access_token_with_generation(&self) -> (Option<String>, u64) {
        let state = self.state.lock().unwrap();
        (
            state.session.access_token().map(str::to_string),
            state.generation,
        )
    }

    /// Submit credentials and, on success, replace the current session.
    ///
    /// On any failure the existing session (if any) is left untouched.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        login_type: LoginType,
        mode: PersistenceMode,
    ) -> AuthResult<Session> {
        let generation = self.generation();
        self.advance(&AuthMachineInput::LoginAttempt);

        let credentials = match self.request_login(identifier, password, login_type).await {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(login_type = %login_type, error = %e, "Login failed");
                self.finish_failed_login();
                return Err(e);
            }
        };
        let (access_token, refresh_token, user) = credentials;

        let mut state = self.state.lock().unwrap();
        if state.generation != generation {
            drop(state);
            info!("Logout happened during login, discarding login result");
            return Err(AuthError::Superseded);
        }

        if let Err(e) = self.store.write(mode, &access_token, &refresh_token, &user) {
            drop(state);
            warn!(error = %e, "Failed to persist credentials, login aborted");
            self.finish_failed_login();
            return Err(e.into());
        }

        state.session = Session::authenticated(access_token, user, mode, Utc::now());
        state.refresh_token = Some(refresh_token);
        state.generation += 1;
        let session = state.session.clone();
        drop(state);

        self.advance(&AuthMachineInput::LoginSuccess);
        if let Some(user) = session.user() {
            info!(
                username = %user.username,
                user_type = %user.user_type,
                mode = ?mode,
                "Logged in"
            );
        }
        Ok(session)
    }

    fn finish_failed_login(&self) {
        if self.is_logged_in() {
            self.advance(&AuthMachineInput::LoginFailedWithSession);
        } else {
            self.advance(&AuthMachineInput::LoginFailed);
        }
    }

    async fn request_login(
        &self,
        identifier: &str,
        password: &str,
        login_type: LoginType,
    ) -> AuthResult<(String, String, UserRecord)> {
        let body = serde_json::to_value(LoginRequest {
            login_type: login_type.wire_name(),
            identifier,
            password,
        })?;
        let response = self
            .transport
            .execute(OutgoingRequest::post(endpoints::LOGIN, body))
            .await?;

        if !response.is_success() {
            let message = response
                .error_message()
                .unwrap_or_else(|| login_type.generic_failure_message().to_string());
            debug!(status = response.status, "Login rejected by server");
            return Err(AuthError::InvalidCredentials(message));
        }

        let payload: LoginResponse = response.json()?;
        let access_token = required_field(payload.access, "access")?;
        let refresh_token = required_field(payload.refresh, "refresh")?;
        let user_type: UserType = required_field(payload.user_type, "user_type")?
            .parse()
            .map_err(|e: hostel_credential_store::UnknownUserType| {
                AuthError::MalformedResponse(e.to_string())
            })?;

        let username = payload
            .username
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| identifier.trim().to_string());

        let user = UserRecord {
            username,
            user_type,
            email: payload.email,
            roll_number: payload.roll_number,
        };
        Ok((access_token, refresh_token, user))
    }

    /// Clear the session and the store. Safe to call when already logged out.
    pub fn logout(&self) {
        self.advance(&AuthMachineInput::LogoutRequested);
        self.clear_session(None);
        self.advance(&AuthMachineInput::LogoutComplete);
    }

    /// Clear the session if the generation still matches `expected`.
    /// Returns false when a newer identity change made the clear stale.
    fn clear_session(&self, expected: Option<u64>) -> bool {
        let mut state = self.state.lock().unwrap();
        if let Some(expected) = expected {
            if state.generation != expected {
                return false;
            }
        }

        let had_session = state.session.is_authenticated();
        state.session = Session::empty();
        state.refresh_token = None;
        state.generation += 1;

        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored credentials");
        }
        drop(state);

        if had_session {
            info!("Logged out");
        } else {
            debug!("Logout requested with no active session");
        }
        true
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Does nothing without a session. Callers arriving while an attempt is
    /// in flight wait for it and share its outcome. Any failure ends the
    /// session before the error is returned.
    pub async fn refresh(&self) -> AuthResult<()> {
        let target = {
            let ledger = self.refresh_ledger.lock().unwrap();
            if ledger.started > ledger.finished {
                ledger.started
            } else {
                ledger.finished + 1
            }
        };

        let _gate = self.refresh_gate.lock().await;

        {
            let mut ledger = self.refresh_ledger.lock().unwrap();
            if ledger.finished >= target {
                debug!(attempt = target, "Joined in-flight token refresh");
                return ledger
                    .last
                    .clone()
                    .map_or(Ok(()), RefreshOutcome::into_result);
            }
            ledger.started = ledger.finished + 1;
        }

        let result = self.refresh_once().await;

        let mut ledger = self.refresh_ledger.lock().unwrap();
        ledger.finished = ledger.started;
        ledger.last = Some(match &result {
            Ok(outcome) => outcome.clone(),
            Err(AuthError::TokenRefresh(message)) => RefreshOutcome::Failed(message.clone()),
            Err(e) => RefreshOutcome::Failed(e.to_string()),
        });

        result.map(|_| ())
    }

    async fn refresh_once(&self) -> AuthResult<RefreshOutcome> {
        let (refresh_token, generation) = {
            let state = self.state.lock().unwrap();
            match state.refresh_token.clone() {
                Some(token) => (token, state.generation),
                None => {
                    debug!("No session to refresh");
                    return Ok(RefreshOutcome::NoSession);
                }
            }
        };

        self.advance(&AuthMachineInput::RefreshStarted);

        match self.request_access_token(&refresh_token).await {
            Ok(access_token) => self.commit_refresh(generation, access_token),
            Err(e) => {
                if self.generation() != generation {
                    debug!(error = %e, "Session changed during refresh, ignoring failure");
                    return Ok(RefreshOutcome::Discarded);
                }
                warn!(error = %e, "Token refresh failed, logging out");
                self.end_session_after_failed_refresh(generation);
                Err(e)
            }
        }
    }

    async fn request_access_token(&self, refresh_token: &str) -> AuthResult<String> {
        let body = serde_json::to_value(RefreshRequest {
            refresh: refresh_token,
        })?;
        let response = self
            .transport
            .execute(OutgoingRequest::post(endpoints::TOKEN_REFRESH, body))
            .await?;

        if !response.is_success() {
            let message = response
                .error_message()
                .unwrap_or_else(|| format!("server answered HTTP {}", response.status));
            return Err(AuthError::TokenRefresh(message));
        }

        let payload: RefreshResponse = response
            .json()
            .map_err(|e| AuthError::TokenRefresh(e.to_string()))?;
        payload
            .access
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                AuthError::TokenRefresh("response did not include an access token".to_string())
            })
    }

    fn commit_refresh(&self, generation: u64, access_token: String) -> AuthResult<RefreshOutcome> {
        let mut state = self.state.lock().unwrap();
        if state.generation != generation {
            debug!("Session changed during refresh, discarding new access token");
            return Ok(RefreshOutcome::Discarded);
        }
        let mode = match state.session.persistence_mode() {
            Some(mode) => mode,
            None => return Ok(RefreshOutcome::Discarded),
        };

        if let Err(e) = self.store.write_access_token(mode, &access_token) {
            drop(state);
            warn!(error = %e, "Failed to persist refreshed access token, logging out");
            self.end_session_after_failed_refresh(generation);
            return Err(e.into());
        }

        state.session.replace_access_token(access_token, Utc::now());
        drop(state);

        self.advance(&AuthMachineInput::RefreshSuccess);
        info!("Access token refreshed");
        Ok(RefreshOutcome::Refreshed)
    }

    fn end_session_after_failed_refresh(&self, generation: u64) {
        self.advance(&AuthMachineInput::RefreshFailed);
        self.clear_session(Some(generation));
        self.advance(&AuthMachineInput::LogoutComplete);
    }
}

fn required_field(value: Option<String>, name: &str) -> AuthResult<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AuthError::MalformedResponse(format!("login response is missing `{}`", name)))
}
