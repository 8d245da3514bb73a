//! The session manager: the one place the dashboard's session lives.
//!
//! It owns the in-memory [`Session`], mirrors every commit into the
//! persisted store, publishes every change on a `watch` channel, and keeps
//! the proactive refresh timer armed for the current expiry.
//!
//! # Lifecycle
//!
//! ```text
//!             hydrate() ──(stored session)──┐
//!                                           ▼
//! login() ──→ [loading] ──ok──→ set_session() ──→ [success, has_access]
//!                 │                  ▲                    │
//!                 └──err──→ [error]  │               (timer fires / 401)
//!                                    │                    ▼
//!                                    └───────ok──── refresh_session()
//!                                                         │err
//! logout() ────────────────────────────→ clear_session() ◄┘
//! ```
//!
//! # Concurrency
//!
//! The manager is cheap to clone and every clone shares the same state.
//! State updates are synchronous and never held across an `.await`. The only
//! lock held across an await is the refresh gate, which makes refresh
//! single-flight: a caller that queues behind an in-flight refresh adopts
//! its outcome instead of issuing a second request.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use rentalps_protocol::Credentials;
use rentalps_schedule::RefreshScheduler;
use rentalps_transport::UnauthorizedHandler;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::{
    Access, AuthApi, AuthState, KeyValueStore, Session, SessionConfig, SessionError,
    SessionStatus, SessionStorage, SessionUpdate,
};

/// Message recorded when a failed login produced no usable text.
pub const LOGIN_FALLBACK_MESSAGE: &str = "login failed";

struct Inner<A, K> {
    api: A,
    storage: SessionStorage<K>,
    state: watch::Sender<AuthState>,
    scheduler: RefreshScheduler,
    /// Held for the duration of one refresh request.
    refresh_gate: Mutex<()>,
    /// Bumped on every commit and clear.
    generation: AtomicU64,
}

/// Injectable session container.
///
/// ```rust,no_run
/// # async fn run() -> Result<(), rentalps_session::SessionError> {
/// use rentalps_protocol::Credentials;
/// use rentalps_session::{HttpAuthApi, MemoryStore, SessionConfig, SessionManager};
/// use rentalps_transport::ReqwestTransport;
///
/// let transport = ReqwestTransport::new("http://localhost:3000/api".parse().unwrap())?;
/// let session = SessionManager::new(
///     HttpAuthApi::new(transport),
///     MemoryStore::new(),
///     SessionConfig::default(),
/// );
/// session.hydrate();
/// session.login(&Credentials::new("admin@rentalps.id", "secret")).await?;
/// assert!(session.has_access());
/// # Ok(())
/// # }
/// ```
pub struct SessionManager<A, K> {
    inner: Arc<Inner<A, K>>,
}

impl<A, K> Clone for SessionManager<A, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, K> fmt::Debug for SessionManager<A, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("SessionManager")
            .field("status", &state.status)
            .field("has_access", &state.session.has_access)
            .field("initialized", &state.initialized)
            .field("refresh_armed", &self.inner.scheduler.is_armed())
            .finish()
    }
}

impl<A: AuthApi, K: KeyValueStore> SessionManager<A, K> {
    /// Creates an uninitialized manager. Call [`hydrate`](Self::hydrate)
    /// before trusting [`access`](Self::access).
    pub fn new(api: A, store: K, config: SessionConfig) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            inner: Arc::new(Inner {
                api,
                storage: SessionStorage::new(store, config.storage_key),
                state,
                scheduler: RefreshScheduler::new(config.refresh),
                refresh_gate: Mutex::new(()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    // -- Reading ----------------------------------------------------------

    /// A snapshot of the current state.
    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    /// A receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.state.borrow().initialized
    }

    pub fn has_access(&self) -> bool {
        self.inner.state.borrow().session.has_access
    }

    /// Route-guard decision.
    pub fn access(&self) -> Access {
        self.inner.state.borrow().access()
    }

    /// Resolves once the `initialized` latch is set.
    pub async fn wait_initialized(&self) {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so the channel can't close under us.
        let _ = rx.wait_for(|state| state.initialized).await;
    }

    pub fn api(&self) -> &A {
        &self.inner.api
    }

    pub fn storage(&self) -> &SessionStorage<K> {
        &self.inner.storage
    }

    /// The proactive refresh timer.
    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.inner.scheduler
    }

    /// Number of commits and clears so far.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    // -- The four state operations -----------------------------------------

    /// Restores the persisted session. No-op after the first call.
    pub fn hydrate(&self) {
        if self.is_initialized() {
            return;
        }

        let stored = self.inner.storage.read();
        let adopted = stored.is_some();
        self.inner.state.send_modify(|state| {
            if let Some(session) = stored {
                state.session = session;
                state.status = SessionStatus::Success;
            }
            state.initialized = true;
        });

        if adopted {
            self.inner.generation.fetch_add(1, Ordering::AcqRel);
            self.arm_refresh();
        }
        info!(restored = adopted, "session hydrated");
    }

    /// Merges `update` into the session and commits it.
    ///
    /// This is the single commit point: it grants access, records
    /// success, persists the slice, and re-arms the proactive refresh
    /// when the expiry changed.
    ///
    /// # Errors
    /// [`SessionError::MissingAccessToken`] if the merged session would
    /// have no access token. Nothing is committed in that case.
    pub fn set_session(&self, update: impl Into<SessionUpdate>) -> Result<Session, SessionError> {
        let mut session = self.inner.state.borrow().session.clone();
        let armed_for = (session.has_access, session.expires_at);
        session.apply(update.into());
        if session.access_token.is_none() {
            return Err(SessionError::MissingAccessToken);
        }
        session.has_access = true;

        self.inner.storage.write(&session);
        self.inner.state.send_if_modified(|state| {
            let next = AuthState {
                session: session.clone(),
                status: SessionStatus::Success,
                error: None,
                initialized: true,
            };
            let changed = *state != next;
            *state = next;
            changed
        });
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        // Only a new expiry (or newly granted access) moves the timer. A
        // refresh that leaves `expires_at` alone must not fire again.
        if armed_for != (session.has_access, session.expires_at) {
            self.arm_refresh();
        }

        info!(expires_at = ?session.expires_at, "session committed");
        Ok(session)
    }

    /// Drops the session everywhere: memory, storage, and the refresh
    /// timer.
    pub fn clear_session(&self) {
        self.inner.scheduler.cancel();
        self.inner.storage.erase();
        self.inner.state.send_if_modified(|state| {
            let next = AuthState {
                initialized: true,
                ..AuthState::default()
            };
            let changed = *state != next;
            *state = next;
            changed
        });
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        info!("session cleared");
    }

    // -- Server round-trips -----------------------------------------------

    /// Signs in. Never retries.
    ///
    /// On failure the state records `status = error` plus a readable
    /// message, and the error is returned as well.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, SessionError> {
        self.inner.state.send_modify(|state| {
            state.status = SessionStatus::Loading;
            state.error = None;
        });

        let result = match self.inner.api.login(credentials).await {
            Ok(server) => self.set_session(SessionUpdate::from_server(server, None)),
            Err(e) => Err(e),
        };

        match result {
            Ok(session) => {
                info!(email = %credentials.email, "login succeeded");
                Ok(session)
            }
            Err(e) => {
                let message = e.user_message();
                let message = if message.trim().is_empty() {
                    LOGIN_FALLBACK_MESSAGE.to_string()
                } else {
                    message
                };
                warn!(email = %credentials.email, error = %message, "login failed");
                self.inner.state.send_modify(|state| {
                    state.status = SessionStatus::Error;
                    state.error = Some(message);
                });
                Err(e)
            }
        }
    }

    /// Rotates the session using the transport-level refresh credential.
    ///
    /// A server response without `user` keeps the current one. Any failure
    /// clears the session before it is returned.
    ///
    /// Single-flight: if another refresh (or any commit or clear) lands
    /// while this call waits for the gate, its outcome is adopted instead
    /// of refreshing again. `Err(NoSession)` is returned when that outcome
    /// left no session.
    pub async fn refresh_session(&self) -> Result<Session, SessionError> {
        let observed = self.generation();
        let _gate = self.inner.refresh_gate.lock().await;

        if self.generation() != observed {
            let session = self.inner.state.borrow().session.clone();
            debug!(has_access = session.has_access, "refresh coalesced with one already in flight");
            return if session.has_access {
                Ok(session)
            } else {
                Err(SessionError::NoSession)
            };
        }

        let fallback_user = self.inner.state.borrow().session.user.clone();
        let result = match self.inner.api.refresh().await {
            Ok(server) => self.set_session(SessionUpdate::from_server(server, fallback_user)),
            Err(e) => Err(e),
        };

        match result {
            Ok(session) => {
                debug!("session refreshed");
                Ok(session)
            }
            Err(e) => {
                warn!(error = %e, "refresh failed, clearing session");
                self.clear_session();
                Err(e)
            }
        }
    }

    /// Best-effort server logout, then an unconditional local clear.
    pub async fn logout(&self) {
        if let Err(e) = self.inner.api.logout().await {
            warn!(error = %e, "logout request failed, clearing session anyway");
        }
        self.clear_session();
    }

    // -- Proactive refresh ------------------------------------------------

    /// Arms the timer for the current session, or cancels it when there is
    /// nothing to refresh.
    fn arm_refresh(&self) {
        let (has_access, expires_at) = {
            let state = self.inner.state.borrow();
            (state.session.has_access, state.session.expires_at)
        };

        match expires_at {
            Some(expires_at) if has_access => {
                let weak = Arc::downgrade(&self.inner);
                self.inner
                    .scheduler
                    .arm_for_expiry(expires_at, scheduled_refresh(weak));
            }
            _ => {
                self.inner.scheduler.cancel();
            }
        }
    }
}

/// Timer body. Holds only a weak handle, so a pending timer never keeps a
/// dropped manager alive.
async fn scheduled_refresh<A: AuthApi, K: KeyValueStore>(inner: Weak<Inner<A, K>>) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let manager = SessionManager { inner };
    debug!("proactive refresh starting");
    if let Err(e) = manager.refresh_session().await {
        warn!(error = %e, "proactive refresh failed");
    }
}

impl<A: AuthApi, K: KeyValueStore> UnauthorizedHandler for SessionManager<A, K> {
    type Error = SessionError;

    /// With no session held there is nothing to refresh: clear and refuse.
    async fn recover(&self) -> Result<(), SessionError> {
        if !self.has_access() {
            debug!("unauthorized with no session, clearing");
            self.clear_session();
            return Err(SessionError::NoSession);
        }
        self.refresh_session().await.map(|_| ())
    }

    fn access_token(&self) -> Option<String> {
        self.inner.state.borrow().session.access_token.clone()
    }
}
