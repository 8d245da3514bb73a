//! Wire protocol for the RentalPS auth client.
//!
//! This crate defines the "language" that the dashboard and the API
//! server speak:
//!
//! - **Types** ([`Credentials`], [`SessionEnvelope`], [`ServerSession`],
//!   [`ErrorBody`]): the bodies that travel on the wire.
//! - **Endpoints** ([`endpoint`]): the auth paths, relative to the API base.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those bodies are
//!   converted to/from bytes. The persisted session slice uses the same
//!   codec.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits below both the transport and the session
//! layers. It doesn't know about HTTP or storage; it only knows how to
//! serialize and deserialize bodies.
//!
//! ```text
//! Transport (bytes) → Protocol (SessionEnvelope) → Session (AuthState)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod error;
mod types;

pub mod endpoint;
pub mod timestamp;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{Credentials, ErrorBody, ServerSession, SessionEnvelope};
