//! Transport abstraction layer for the RentalPS auth client.
//!
//! Provides the [`HttpTransport`] trait that abstracts over the HTTP
//! client, and [`ApiClient`], which wraps a transport so that a `401`
//! triggers exactly one coordinated recovery attempt per request.
//!
//! # Feature Flags
//!
//! - `reqwest` (default): HTTP transport via `reqwest`, with a cookie
//!   store standing in for the browser's credentialed requests.

mod client;
mod error;
#[cfg(feature = "reqwest")]
mod http;

pub use client::{ApiClient, NoRecovery, UnauthorizedHandler};
pub use error::{ApiError, TransportError};
#[cfg(feature = "reqwest")]
pub use http::ReqwestTransport;

use std::fmt;
use std::future::Future;

/// HTTP verbs used by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// An outbound request, relative to the transport's base URL.
///
/// The request carries no retry bookkeeping: whether it has already been
/// replayed is tracked by [`ApiClient::send`] for the duration of one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path below the API base, e.g. `/auth/login` or `/users?page=2`.
    pub path: String,
    /// Already-encoded body. `None` sends no body at all.
    pub body: Option<Vec<u8>>,
    /// Bearer credential for the `Authorization` header.
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

/// A response as received from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    /// Canonical reason phrase ("Unauthorized"), empty if unknown.
    pub status_text: String,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: String::new(),
            body: body.into(),
        }
    }

    pub fn with_status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = text.into();
        self
    }

    /// `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests to the API server.
///
/// Implementations must report every non-2xx response as
/// [`TransportError::Status`], so callers only ever see successful
/// responses on the `Ok` path.
pub trait HttpTransport: Send + Sync + 'static {
    /// Issues a single request. Never retries.
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;
}
