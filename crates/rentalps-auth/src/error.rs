//! Unified error type for the RentalPS auth client.

use rentalps_protocol::ProtocolError;
use rentalps_session::{SessionError, StorageError};
use rentalps_transport::{ApiError, TransportError};

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `rentalps-auth` crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthClientError {
    /// A transport-level error (network, non-2xx status).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A body could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (login rejected, refresh failed, no session).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A request through the interceptor failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The session directory could not be opened.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The configuration file or environment could not be read.
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("invalid api url {url:?}: {source}")]
    InvalidApiUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl AuthClientError {
    /// HTTP status of the failed call, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status(),
            Self::Session(e) => e.status(),
            Self::Api(e) => match recovery_failure(e) {
                Some(session) => session.status(),
                None => e.status(),
            },
            _ => None,
        }
    }

    /// Human-readable message for the UI (server message first).
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(e) => e.user_message(),
            Self::Session(e) => e.user_message(),
            Self::Api(e) => match recovery_failure(e) {
                Some(session) => session.user_message(),
                None => e.user_message(),
            },
            other => other.to_string(),
        }
    }
}

/// The session error behind a failed unauthorized recovery.
fn recovery_failure(error: &ApiError) -> Option<&SessionError> {
    error.recovery_error()?.downcast_ref::<SessionError>()
}
