//! The unauthorized interceptor: an explicit wrapper around every call.
//!
//! ```text
//! send(req) ──→ attempt #1 ──ok──→ response
//!                   │
//!                  401, not exempt, handler configured
//!                   │
//!                   ▼
//!              handler.recover() ──err──→ ApiError::Recovery
//!                   │ok
//!                   ▼
//!              attempt #2 ──→ response, or the second error as-is
//! ```
//!
//! Each call to [`ApiClient::send`] owns its own retry budget. Nothing is
//! written onto the request, so a request value can be sent again later
//! and gets a fresh budget.

use std::error::Error as StdError;
use std::future::Future;

use rentalps_protocol::{Codec, JsonCodec, endpoint};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{ApiError, ApiRequest, ApiResponse, HttpTransport, Method, TransportError};

/// The recovery callback invoked when a request comes back `401`.
///
/// The session layer implements this: it refreshes the session (or clears
/// it and refuses, when there is nothing to refresh).
pub trait UnauthorizedHandler: Send + Sync + 'static {
    /// The error returned when recovery fails. It replaces the original
    /// `401` in what the caller sees.
    type Error: StdError + Send + Sync + 'static;

    /// Attempts to make the next attempt succeed, typically by rotating
    /// the session's tokens.
    fn recover(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Bearer credential to attach to each attempt. Read per attempt, so
    /// the replayed request carries the token minted by `recover`.
    fn access_token(&self) -> Option<String> {
        None
    }
}

/// Placeholder handler type for an [`ApiClient`] with no recovery wired.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRecovery;

impl UnauthorizedHandler for NoRecovery {
    type Error = std::convert::Infallible;

    async fn recover(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// HTTP client with transparent, single-shot recovery from `401`.
pub struct ApiClient<T, H = NoRecovery, C = JsonCodec> {
    transport: T,
    handler: Option<H>,
    codec: C,
    /// Paths that never trigger recovery. Always contains the refresh
    /// endpoint, so a rejected refresh can't recurse into another refresh.
    exempt: Vec<String>,
}

impl<T: HttpTransport> ApiClient<T> {
    /// Creates a client with no recovery callback: every error propagates.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            handler: None,
            codec: JsonCodec,
            exempt: vec![endpoint::REFRESH.to_string()],
        }
    }
}

impl<T, H, C> ApiClient<T, H, C>
where
    T: HttpTransport,
    H: UnauthorizedHandler,
    C: Codec,
{
    /// Wires the recovery callback. Called once at application start.
    pub fn with_unauthorized_handler<H2: UnauthorizedHandler>(
        self,
        handler: H2,
    ) -> ApiClient<T, H2, C> {
        ApiClient {
            transport: self.transport,
            handler: Some(handler),
            codec: self.codec,
            exempt: self.exempt,
        }
    }

    /// Adds a path that must never trigger recovery (matched by
    /// containment, like the refresh endpoint).
    pub fn exempt_path(mut self, path: impl Into<String>) -> Self {
        self.exempt.push(path.into());
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn has_unauthorized_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Sends a request, recovering from a `401` at most once.
    ///
    /// # Errors
    /// - [`ApiError::Recovery`]: the request got `401` and recovery failed.
    /// - [`ApiError::Transport`]: any other failure, including a second
    ///   `401` after a successful recovery.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let original = match self.attempt(&request).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        let Some(handler) = self.recovery_handler(&request, &original) else {
            return Err(original.into());
        };

        debug!(method = %request.method, path = %request.path, "unauthorized, recovering session");
        if let Err(e) = handler.recover().await {
            warn!(path = %request.path, error = %e, "session recovery failed");
            return Err(ApiError::Recovery(Box::new(e)));
        }

        // Second and final attempt: its outcome is returned as-is.
        debug!(method = %request.method, path = %request.path, "replaying request after recovery");
        self.attempt(&request).await.map_err(ApiError::from)
    }

    /// Returns the handler if this failure qualifies for recovery.
    fn recovery_handler(&self, request: &ApiRequest, error: &TransportError) -> Option<&H> {
        if !error.is_unauthorized() {
            return None;
        }
        if self.is_exempt(&request.path) {
            debug!(path = %request.path, "unauthorized on exempt path, not recovering");
            return None;
        }
        self.handler.as_ref()
    }

    fn is_exempt(&self, path: &str) -> bool {
        self.exempt.iter().any(|p| path.contains(p.as_str()))
    }

    async fn attempt(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        match self.handler.as_ref().and_then(|h| h.access_token()) {
            Some(token) => {
                let authorized = request.clone().with_bearer(token);
                self.transport.send(&authorized).await
            }
            None => self.transport.send(request).await,
        }
    }

    // -- Typed helpers ------------------------------------------------------

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        self.request(Method::Get, path, None).await
    }

    pub async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        let body = self.codec.encode(body)?;
        self.request(Method::Post, path, Some(body)).await
    }

    pub async fn put<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        let body = self.codec.encode(body)?;
        self.request(Method::Put, path, Some(body)).await
    }

    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        self.request(Method::Delete, path, None).await
    }

    async fn request<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<R, ApiError> {
        let mut request = ApiRequest::new(method, path);
        request.body = body;
        let response = self.send(request).await?;
        // 204 and friends: decode as JSON `null` so `R = ()` or
        // `Option<_>` work without special-casing at call sites.
        let body: &[u8] = if response.body.is_empty() {
            b"null"
        } else {
            &response.body
        };
        Ok(self.codec.decode(body)?)
    }
}

impl<T: Clone, H: Clone, C: Clone> Clone for ApiClient<T, H, C> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            handler: self.handler.clone(),
            codec: self.codec.clone(),
            exempt: self.exempt.clone(),
        }
    }
}
