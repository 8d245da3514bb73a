use std::error::Error as StdError;

use rentalps_protocol::{ErrorBody, ProtocolError};

use crate::ApiResponse;

/// Last-resort message when nothing more specific is available.
pub const FALLBACK_MESSAGE: &str = "request failed";

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The server answered with a non-2xx status.
    #[error("request failed with status {}", .0.status)]
    Status(ApiResponse),

    /// The request never produced a response (DNS, refused, reset, ...).
    #[error("network error: {0}")]
    Network(String),

    /// The request path could not be joined onto the base URL.
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
}

impl TransportError {
    /// HTTP status, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status(response) => Some(response.status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Human-readable message for the UI.
    ///
    /// Fallback chain: body `message` → status text → transport error
    /// text → [`FALLBACK_MESSAGE`].
    pub fn user_message(&self) -> String {
        if let Self::Status(response) = self {
            if let Some(message) = ErrorBody::message_from(&response.body) {
                return message;
            }
            if !response.status_text.trim().is_empty() {
                return response.status_text.clone();
            }
        }
        let text = self.to_string();
        if text.trim().is_empty() {
            FALLBACK_MESSAGE.to_string()
        } else {
            text
        }
    }
}

/// Errors returned by [`ApiClient`](crate::ApiClient).
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request failed and was not (or could no longer be) recovered.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A `401` triggered recovery, and recovery itself failed. This
    /// replaces the original `401`.
    #[error("{0}")]
    Recovery(Box<dyn StdError + Send + Sync + 'static>),

    /// The response body could not be decoded (or the request body
    /// encoded).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ApiError {
    /// HTTP status of the final failed attempt, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// The recovery failure, for callers that want to downcast it.
    pub fn recovery_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            Self::Recovery(e) => Some(e.as_ref()),
            _ => None,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}
