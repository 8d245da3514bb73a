//! Wire types for the auth endpoints.
//!
//! Field names follow the server's camelCase JSON. Every field the server
//! might leave out is an `Option` with `#[serde(default)]`, so a sparse
//! response never fails to decode; the session layer decides what a
//! missing field means.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::timestamp;

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Body of a login request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Hand-written so the password never ends up in a log line.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ServerSession / SessionEnvelope
// ---------------------------------------------------------------------------

/// A session as the server sends it.
///
/// `user` is opaque to this client: whatever identity record the server
/// returns is stored and handed back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSession {
    #[serde(default)]
    pub user: Option<Value>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default, with = "timestamp::option")]
    pub expires_at: Option<OffsetDateTime>,
}

/// Body of a successful login or refresh response: `{ "session": { ... } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionEnvelope {
    #[serde(default)]
    pub session: Option<ServerSession>,
}

// ---------------------------------------------------------------------------
// ErrorBody
// ---------------------------------------------------------------------------

/// The standard error payload: `{ "message": "..." }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Extracts a non-empty `message` from a raw response body.
    ///
    /// Returns `None` for bodies that aren't JSON objects, have no
    /// `message`, or carry an empty one.
    pub fn message_from(body: &[u8]) -> Option<String> {
        serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;

    use super::*;

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("a@b.com", "hunter2");

        let printed = format!("{creds:?}");

        assert!(printed.contains("a@b.com"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn test_credentials_serialize_shape() {
        let value = serde_json::to_value(Credentials::new("a@b.com", "x")).unwrap();

        assert_eq!(value, json!({"email": "a@b.com", "password": "x"}));
    }

    #[test]
    fn test_envelope_decodes_full_session() {
        let body = json!({
            "session": {
                "user": {"id": 1},
                "accessToken": "t1",
                "refreshToken": "r1",
                "expiresAt": "2026-10-19T12:00:00Z"
            }
        });

        let envelope: SessionEnvelope = serde_json::from_value(body).unwrap();
        let session = envelope.session.expect("session present");

        assert_eq!(session.user, Some(json!({"id": 1})));
        assert_eq!(session.access_token.as_deref(), Some("t1"));
        assert_eq!(session.refresh_token.as_deref(), Some("r1"));
        assert_eq!(session.expires_at, Some(datetime!(2026-10-19 12:00:00 UTC)));
    }

    #[test]
    fn test_envelope_decodes_offset_less_expiry() {
        let body = json!({
            "session": {"accessToken": "t1", "expiresAt": "2026-10-19T12:00:00.000"}
        });

        let envelope: SessionEnvelope = serde_json::from_value(body).unwrap();

        assert_eq!(
            envelope.session.and_then(|s| s.expires_at),
            Some(datetime!(2026-10-19 12:00:00 UTC))
        );
    }

    #[test]
    fn test_envelope_without_session_decodes_to_none() {
        let envelope: SessionEnvelope = serde_json::from_value(json!({"ok": true})).unwrap();

        assert!(envelope.session.is_none());
    }

    #[test]
    fn test_server_session_tolerates_missing_user() {
        let session: ServerSession =
            serde_json::from_value(json!({"accessToken": "t2"})).unwrap();

        assert!(session.user.is_none());
        assert_eq!(session.access_token.as_deref(), Some("t2"));
    }

    #[test]
    fn test_error_body_message_from_json() {
        let msg = ErrorBody::message_from(br#"{"message":"Email atau password salah"}"#);

        assert_eq!(msg.as_deref(), Some("Email atau password salah"));
    }

    #[test]
    fn test_error_body_message_from_non_json_is_none() {
        assert_eq!(ErrorBody::message_from(b"Bad Gateway"), None);
    }

    #[test]
    fn test_error_body_empty_message_is_none() {
        assert_eq!(ErrorBody::message_from(br#"{"message":"  "}"#), None);
    }
}
