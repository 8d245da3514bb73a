//! Authenticated-session management for the RentalPS dashboard client.
//!
//! This crate owns the lifecycle of the signed-in admin:
//!
//! 1. **Server calls**: login, refresh, and logout ([`AuthApi`] trait,
//!    [`HttpAuthApi`] over any transport)
//! 2. **State**: the session, the outcome of the last attempt, and the
//!    `initialized` latch ([`SessionManager`], [`AuthState`])
//! 3. **Persistence**: a mirror of the session in a durable key-value slot
//!    ([`SessionStorage`] over a [`KeyValueStore`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Application (above)  ← route guards read `access()`, calls go through ApiClient
//!     ↕
//! Session Layer (this crate)  ← commits, clears, refreshes; answers 401 recovery
//!     ↕
//! Transport + Schedule (below)  ← HTTP requests, the proactive refresh timer
//! ```

mod api;
mod error;
mod manager;
mod session;
mod storage;

pub use api::{AuthApi, HttpAuthApi};
pub use error::SessionError;
pub use manager::{LOGIN_FALLBACK_MESSAGE, SessionManager};
pub use session::{Access, AuthState, Session, SessionConfig, SessionStatus, SessionUpdate};
pub use storage::{FileStore, KeyValueStore, MemoryStore, SessionStorage, StorageError};
