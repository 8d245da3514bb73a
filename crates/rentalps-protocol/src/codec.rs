//! Codec trait and implementations for serializing/deserializing bodies.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! Neither the transport nor the session storage cares HOW bodies are
//! serialized; they only need something that implements [`Codec`].
//! Today that is always [`JsonCodec`], since the API speaks JSON and the
//! persisted session slice is stored as JSON text.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// ## Trait bounds
///
/// - `Send + Sync` → the codec is held by the HTTP client and the session
///   manager, both of which are shared across tokio tasks.
/// - `'static` → the codec owns everything it needs.
/// - `Clone` → every layer keeps its own copy; codecs are unit structs.
pub trait Codec: Clone + Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use rentalps_protocol::{Codec, Credentials, JsonCodec};
///
/// let codec = JsonCodec;
/// let creds = Credentials::new("a@b.com", "x");
///
/// let bytes = codec.encode(&creds).unwrap();
/// let decoded: Credentials = codec.decode(&bytes).unwrap();
/// assert_eq!(creds, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionEnvelope;

    #[test]
    fn test_decode_malformed_json_returns_decode_error() {
        let result: Result<SessionEnvelope, _> = JsonCodec.decode(b"<html>502</html>");

        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_truncated_json_returns_decode_error() {
        let result: Result<SessionEnvelope, _> = JsonCodec.decode(br#"{"session": {"#);

        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_error_message_mentions_decode() {
        let err = JsonCodec
            .decode::<SessionEnvelope>(b"nope")
            .expect_err("should fail");

        assert!(err.to_string().starts_with("decode failed"));
    }
}
