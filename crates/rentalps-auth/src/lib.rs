//! # RentalPS auth
//!
//! Authenticated-session client for the RentalPS admin dashboard.
//!
//! An [`AuthClient`] signs an admin in, keeps the session persisted and
//! fresh (a proactive refresh shortly before expiry), and sends API calls
//! that recover transparently from a single `401` by refreshing the
//! session and replaying the request once.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rentalps_auth::prelude::*;
//!
//! # async fn run() -> Result<(), AuthClientError> {
//! let config = ClientConfig::load(Some("rentalps.toml"))?;
//! let client = AuthClient::from_config(&config)?;
//!
//! if client.session().access() == Access::Denied {
//!     client.login("admin@rentalps.id", "secret").await?;
//! }
//! let bookings: serde_json::Value = client.get("/bookings").await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;

pub use self::client::{AuthClient, AuthClientBuilder, ClientApi, ClientSession, ClientStore};
pub use self::config::{ClientConfig, ENV_PREFIX};
pub use error::AuthClientError;

pub use rentalps_protocol as protocol;
pub use rentalps_schedule as schedule;
pub use rentalps_session as session;
pub use rentalps_transport as transport;

pub mod prelude {
    pub use crate::{AuthClient, AuthClientBuilder, AuthClientError, ClientConfig};
    pub use rentalps_protocol::Credentials;
    pub use rentalps_session::{Access, AuthState, Session, SessionStatus};
    pub use rentalps_transport::ApiError;
}
