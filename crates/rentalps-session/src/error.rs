//! Error types for the session layer.

use rentalps_protocol::ProtocolError;
use rentalps_transport::TransportError;

/// Errors that can occur during session management.
///
/// These cover the lifecycle of a dashboard session: login, refresh,
/// unauthorized recovery, and commit validation.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The server answered 2xx but the body had no `session` object.
    #[error("session not available")]
    MissingSession,

    /// A commit would have produced `has_access` without an access token.
    #[error("session has no access token")]
    MissingAccessToken,

    /// Recovery was requested but no session is held, so there is nothing
    /// to refresh.
    #[error("no active session")]
    NoSession,

    /// The login/refresh/logout call failed at the HTTP level.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response body could not be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl SessionError {
    /// HTTP status of the failed call, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// Human-readable message for the UI (server message first).
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}
