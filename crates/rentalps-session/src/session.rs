//! Session types: the data structures that describe who is signed in.
//!
//! A [`Session`] is the persisted slice: identity, credentials, expiry,
//! and the `has_access` flag. [`AuthState`] wraps it with the bookkeeping
//! the UI binds to: the outcome of the last login/refresh attempt
//! ([`SessionStatus`]), its error message, and the `initialized` latch.

use std::fmt;

use rentalps_protocol::{ServerSession, timestamp};
use rentalps_schedule::RefreshConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for the session container.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Key of the persisted slot. Fixed and versionless: a client built
    /// with a different key simply won't see older sessions.
    pub storage_key: String,

    /// Proactive refresh settings.
    pub refresh: RefreshConfig,
}

impl SessionConfig {
    pub const DEFAULT_STORAGE_KEY: &'static str = "rentalps-auth-session";
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_key: Self::DEFAULT_STORAGE_KEY.to_string(),
            refresh: RefreshConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The authenticated identity and credential bundle.
///
/// Either fully present (after a commit) or fully cleared (the `Default`).
/// `has_access == true` implies `access_token.is_some()`; the session
/// manager refuses to commit anything else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub user: Option<Value>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default, with = "timestamp::option")]
    pub expires_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub has_access: bool,
}

impl Session {
    /// Merges `update` into this session. Fields the update leaves out
    /// are kept.
    pub fn apply(&mut self, update: SessionUpdate) {
        if let Some(user) = update.user {
            // An explicit JSON `null` clears the identity.
            self.user = (!user.is_null()).then_some(user);
        }
        if let Some(token) = update.access_token {
            self.access_token = Some(token);
        }
        if let Some(token) = update.refresh_token {
            self.refresh_token = Some(token);
        }
        if let Some(expires_at) = update.expires_at {
            self.expires_at = Some(expires_at);
        }
    }

    /// `true` for the fully-cleared session.
    pub fn is_cleared(&self) -> bool {
        *self == Self::default()
    }
}

// ---------------------------------------------------------------------------
// SessionUpdate
// ---------------------------------------------------------------------------

/// A partial session, as accepted by `SessionManager::set_session`.
///
/// `None` means "leave this field alone". For `user`, `Some(Value::Null)`
/// means "clear it". Tokens and expiry have no clearing form: a server
/// `null` reads as absent, and only `clear_session` drops them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionUpdate {
    pub user: Option<Value>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<OffsetDateTime>,
}

impl SessionUpdate {
    /// Normalizes a server session. The identity is always replaced: by the
    /// server's `user`, else by `fallback_user`, else cleared.
    pub fn from_server(server: ServerSession, fallback_user: Option<Value>) -> Self {
        Self {
            user: Some(server.user.or(fallback_user).unwrap_or(Value::Null)),
            access_token: server.access_token,
            refresh_token: server.refresh_token,
            expires_at: server.expires_at,
        }
    }

    pub fn user(mut self, user: Value) -> Self {
        self.user = Some(user);
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    pub fn expires_at(mut self, at: OffsetDateTime) -> Self {
        self.expires_at = Some(at);
        self
    }
}

impl From<Session> for SessionUpdate {
    fn from(session: Session) -> Self {
        Self {
            user: Some(session.user.unwrap_or(Value::Null)),
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            expires_at: session.expires_at,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Outcome of the most recent login/refresh attempt.
///
/// ```text
///   Idle ──(login)──→ Loading ──→ Success
///                        │
///                        └──────→ Error
/// ```
///
/// Orthogonal to `has_access`: a cleared session can still report
/// `Error` with the message of the login that just failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

// ---------------------------------------------------------------------------
// AuthState
// ---------------------------------------------------------------------------

/// Route-guard decision for a protected screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Hydration hasn't run yet. Show a loading placeholder; don't read
    /// session data.
    Pending,
    /// Render the protected content.
    Granted,
    /// Redirect to the login screen.
    Denied,
}

/// Everything the UI binds to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub session: Session,
    pub status: SessionStatus,
    /// Human-readable message of the last failed login.
    pub error: Option<String>,
    /// One-way latch: set by the first hydrate or any session mutation.
    pub initialized: bool,
}

impl AuthState {
    pub fn has_access(&self) -> bool {
        self.session.has_access
    }

    pub fn access(&self) -> Access {
        match (self.initialized, self.session.has_access) {
            (false, _) => Access::Pending,
            (true, true) => Access::Granted,
            (true, false) => Access::Denied,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;

    use super::*;

    fn full_session() -> Session {
        Session {
            user: Some(json!({"id": 1})),
            access_token: Some("t1".into()),
            refresh_token: Some("r1".into()),
            expires_at: Some(datetime!(2026-10-19 12:00:00 UTC)),
            has_access: true,
        }
    }

    #[test]
    fn test_apply_keeps_fields_left_out() {
        let mut session = full_session();

        session.apply(SessionUpdate::default().access_token("t2"));

        assert_eq!(session.access_token.as_deref(), Some("t2"));
        assert_eq!(session.refresh_token.as_deref(), Some("r1"));
        assert_eq!(session.user, Some(json!({"id": 1})));
    }

    #[test]
    fn test_apply_null_refresh_token_keeps_current() {
        let server: ServerSession =
            serde_json::from_value(json!({"accessToken": "t2", "refreshToken": null})).unwrap();
        let mut session = full_session();

        session.apply(SessionUpdate::from_server(server, None));

        assert_eq!(session.access_token.as_deref(), Some("t2"));
        assert_eq!(session.refresh_token.as_deref(), Some("r1"));
    }

    #[test]
    fn test_apply_null_user_clears_identity() {
        let mut session = full_session();

        session.apply(SessionUpdate::default().user(Value::Null));

        assert_eq!(session.user, None);
    }

    #[test]
    fn test_from_server_uses_fallback_user_when_omitted() {
        let server = ServerSession {
            access_token: Some("t2".into()),
            ..ServerSession::default()
        };

        let update = SessionUpdate::from_server(server, Some(json!({"id": 1})));

        assert_eq!(update.user, Some(json!({"id": 1})));
    }

    #[test]
    fn test_from_server_prefers_server_user() {
        let server = ServerSession {
            user: Some(json!({"id": 2})),
            ..ServerSession::default()
        };

        let update = SessionUpdate::from_server(server, Some(json!({"id": 1})));

        assert_eq!(update.user, Some(json!({"id": 2})));
    }

    #[test]
    fn test_from_server_without_any_user_clears() {
        let update = SessionUpdate::from_server(ServerSession::default(), None);

        assert_eq!(update.user, Some(Value::Null));
    }

    #[test]
    fn test_session_serializes_camel_case_slice() {
        let value = serde_json::to_value(full_session()).unwrap();

        assert_eq!(
            value,
            json!({
                "user": {"id": 1},
                "accessToken": "t1",
                "refreshToken": "r1",
                "expiresAt": "2026-10-19T12:00:00Z",
                "hasAccess": true
            })
        );
    }

    #[test]
    fn test_default_session_is_cleared() {
        assert!(Session::default().is_cleared());
        assert!(!full_session().is_cleared());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SessionStatus::Idle.to_string(), "idle");
        assert_eq!(SessionStatus::Error.to_string(), "error");
    }

    #[test]
    fn test_access_pending_until_initialized() {
        let state = AuthState {
            session: full_session(),
            ..AuthState::default()
        };

        assert_eq!(state.access(), Access::Pending);
    }

    #[test]
    fn test_access_granted_and_denied() {
        let granted = AuthState {
            session: full_session(),
            initialized: true,
            ..AuthState::default()
        };
        let denied = AuthState {
            initialized: true,
            ..AuthState::default()
        };

        assert_eq!(granted.access(), Access::Granted);
        assert_eq!(denied.access(), Access::Denied);
    }

    #[test]
    fn test_default_config_uses_fixed_key() {
        assert_eq!(SessionConfig::default().storage_key, "rentalps-auth-session");
    }
}
