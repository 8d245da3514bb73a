//! The auth endpoints the session manager talks to.
//!
//! The session layer doesn't care how login, refresh, and logout reach the
//! server. It only needs something that implements [`AuthApi`]. In
//! production that is [`HttpAuthApi`] over a real transport; in tests it is
//! a scripted fake.
//!
//! Auth calls go straight to the transport, never through the unauthorized
//! interceptor: a rejected login must surface the server's message, not
//! trigger a refresh.

use std::future::Future;

use rentalps_protocol::{Codec, Credentials, JsonCodec, ServerSession, SessionEnvelope, endpoint};
use rentalps_transport::{ApiRequest, HttpTransport};
use tracing::debug;

use crate::SessionError;

/// Server-side session operations.
///
/// # Example
///
/// ```rust
/// use rentalps_protocol::{Credentials, ServerSession};
/// use rentalps_session::{AuthApi, SessionError};
///
/// /// Accepts any credentials and mints a fixed token.
/// struct DevAuth;
///
/// impl AuthApi for DevAuth {
///     async fn login(&self, _: &Credentials) -> Result<ServerSession, SessionError> {
///         Ok(ServerSession {
///             access_token: Some("dev".into()),
///             ..ServerSession::default()
///         })
///     }
///
///     async fn refresh(&self) -> Result<ServerSession, SessionError> {
///         Err(SessionError::MissingSession)
///     }
///
///     async fn logout(&self) -> Result<(), SessionError> {
///         Ok(())
///     }
/// }
/// ```
pub trait AuthApi: Send + Sync + 'static {
    /// Exchanges credentials for a session.
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<ServerSession, SessionError>> + Send;

    /// Mints a new session from the transport-level credential (the
    /// refresh cookie). Sends no body.
    fn refresh(&self) -> impl Future<Output = Result<ServerSession, SessionError>> + Send;

    /// Ends the server-side session. The response body is ignored.
    fn logout(&self) -> impl Future<Output = Result<(), SessionError>> + Send;
}

/// [`AuthApi`] over any [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpAuthApi<T, C = JsonCodec> {
    transport: T,
    codec: C,
}

impl<T: HttpTransport> HttpAuthApi<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            codec: JsonCodec,
        }
    }
}

impl<T: HttpTransport, C: Codec> HttpAuthApi<T, C> {
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Decodes a `{ "session": ... }` envelope. A 2xx without a session
    /// object is an error, not an empty session.
    fn session_from(&self, body: &[u8]) -> Result<ServerSession, SessionError> {
        let envelope: SessionEnvelope = self.codec.decode(body)?;
        envelope.session.ok_or(SessionError::MissingSession)
    }
}

impl<T: HttpTransport, C: Codec> AuthApi for HttpAuthApi<T, C> {
    async fn login(&self, credentials: &Credentials) -> Result<ServerSession, SessionError> {
        let body = self.codec.encode(credentials)?;
        let request = ApiRequest::post(endpoint::LOGIN).with_body(body);
        debug!(email = %credentials.email, "login request");

        let response = self.transport.send(&request).await?;
        self.session_from(&response.body)
    }

    async fn refresh(&self) -> Result<ServerSession, SessionError> {
        let response = self.transport.send(&ApiRequest::post(endpoint::REFRESH)).await?;
        self.session_from(&response.body)
    }

    async fn logout(&self) -> Result<(), SessionError> {
        self.transport.send(&ApiRequest::post(endpoint::LOGOUT)).await?;
        Ok(())
    }
}
