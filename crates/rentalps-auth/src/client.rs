//! `AuthClient` builder and the wiring between the layers.
//!
//! This is the entry point for an application talking to the RentalPS
//! API. It ties together transport → session → interceptor:
//!
//! ```text
//!                 ┌──────────── ReqwestTransport (shared cookie jar) ───────────┐
//!                 ▼                                                             ▼
//!   HttpAuthApi ──→ SessionManager ──(recovery callback)──→ ApiClient ──→ your calls
//!                       │
//!                  ClientStore (memory or files)
//! ```

use std::path::PathBuf;
use std::time::Duration;

use rentalps_protocol::Credentials;
use rentalps_schedule::RefreshConfig;
use rentalps_session::{
    FileStore, HttpAuthApi, KeyValueStore, MemoryStore, Session, SessionConfig, SessionManager,
    StorageError,
};
use rentalps_transport::{ApiClient, ReqwestTransport};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;
use url::Url;

use crate::AuthClientError;
use crate::config::{ClientConfig, api_base};

/// Where the session is persisted.
#[derive(Debug, Clone)]
pub enum ClientStore {
    /// Lost when the process exits.
    Memory(MemoryStore),
    /// One JSON file per key in a directory.
    Files(FileStore),
}

impl KeyValueStore for ClientStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self {
            Self::Memory(s) => s.get(key),
            Self::Files(s) => s.get(key),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        match self {
            Self::Memory(s) => s.set(key, value),
            Self::Files(s) => s.set(key, value),
        }
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match self {
            Self::Memory(s) => s.remove(key),
            Self::Files(s) => s.remove(key),
        }
    }
}

/// The session manager as wired by [`AuthClient`].
pub type ClientSession = SessionManager<HttpAuthApi<ReqwestTransport>, ClientStore>;

/// The interceptor-wrapped API client as wired by [`AuthClient`].
pub type ClientApi = ApiClient<ReqwestTransport, ClientSession>;

/// Builder for configuring an [`AuthClient`].
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> Result<(), rentalps_auth::AuthClientError> {
/// use rentalps_auth::prelude::*;
///
/// let client = AuthClient::builder()
///     .api_url("http://localhost:3000")
///     .session_dir("/var/lib/rentalps")
///     .build()?;
/// client.login("admin@rentalps.id", "secret").await?;
/// let units: serde_json::Value = client.get("/units").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AuthClientBuilder {
    api_url: String,
    session_dir: Option<PathBuf>,
    session_config: SessionConfig,
    exempt: Vec<String>,
    http: Option<reqwest::Client>,
}

impl AuthClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::from_config(&ClientConfig::default())
    }

    /// Starts from a loaded [`ClientConfig`].
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            api_url: config.api_url.clone(),
            session_dir: config.session_dir.clone(),
            session_config: config.session_config(),
            exempt: Vec::new(),
            http: None,
        }
    }

    /// Sets the server origin. Requests go to `<origin>/api`.
    pub fn api_url(mut self, origin: impl Into<String>) -> Self {
        self.api_url = origin.into();
        self
    }

    /// Persists the session in `dir`.
    pub fn session_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.session_dir = Some(dir.into());
        self
    }

    /// Keeps the session in memory only.
    pub fn memory_store(mut self) -> Self {
        self.session_dir = None;
        self
    }

    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.session_config.storage_key = key.into();
        self
    }

    pub fn refresh_buffer(mut self, buffer: Duration) -> Self {
        self.session_config.refresh = RefreshConfig::with_buffer(buffer);
        self
    }

    /// Adds a path that must never trigger unauthorized recovery.
    pub fn exempt_path(mut self, path: impl Into<String>) -> Self {
        self.exempt.push(path.into());
        self
    }

    /// Uses a preconfigured HTTP client. It must have its cookie store
    /// enabled for refresh to work.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Wires the layers and restores any persisted session.
    pub fn build(self) -> Result<AuthClient, AuthClientError> {
        let base_url: Url = api_base(&self.api_url)?;
        let transport = match self.http {
            Some(http) => ReqwestTransport::with_client(http, base_url),
            None => ReqwestTransport::new(base_url)?,
        };

        let store = match &self.session_dir {
            Some(dir) => ClientStore::Files(FileStore::open(dir)?),
            None => ClientStore::Memory(MemoryStore::new()),
        };

        let session = SessionManager::new(
            HttpAuthApi::new(transport.clone()),
            store,
            self.session_config,
        );
        session.hydrate();

        let api = self
            .exempt
            .into_iter()
            .fold(ApiClient::new(transport), |api, path| api.exempt_path(path))
            .with_unauthorized_handler(session.clone());

        info!(
            api = %api.transport().base_url(),
            persisted = self.session_dir.is_some(),
            has_access = session.has_access(),
            "auth client ready"
        );
        Ok(AuthClient { session, api })
    }
}

impl Default for AuthClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A ready-to-use client: the session container plus the API client whose
/// `401`s it recovers.
///
/// Cheap to clone; clones share the session and the cookie jar.
#[derive(Clone)]
pub struct AuthClient {
    session: ClientSession,
    api: ClientApi,
}

impl AuthClient {
    /// Creates a new builder.
    pub fn builder() -> AuthClientBuilder {
        AuthClientBuilder::new()
    }

    /// Builds a client straight from configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self, AuthClientError> {
        AuthClientBuilder::from_config(config).build()
    }

    pub fn session(&self) -> &ClientSession {
        &self.session
    }

    pub fn api(&self) -> &ClientApi {
        &self.api
    }

    pub async fn login(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Session, AuthClientError> {
        let credentials = Credentials::new(email, password);
        Ok(self.session.login(&credentials).await?)
    }

    pub async fn refresh(&self) -> Result<Session, AuthClientError> {
        Ok(self.session.refresh_session().await?)
    }

    pub async fn logout(&self) {
        self.session.logout().await;
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, AuthClientError> {
        Ok(self.api.get(path).await?)
    }

    pub async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, AuthClientError> {
        Ok(self.api.post(path, body).await?)
    }

    pub async fn put<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, AuthClientError> {
        Ok(self.api.put(path, body).await?)
    }

    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> Result<R, AuthClientError> {
        Ok(self.api.delete(path).await?)
    }
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("base_url", &self.api.transport().base_url().as_str())
            .field("session", &self.session)
            .finish()
    }
}
