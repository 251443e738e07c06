//! Codec trait and implementations for raw messages.
//!
//! A "codec" (coder/decoder) converts between Rust values and the bytes a
//! transport frame carries. The event layer works on
//! [`serde_json::Value`] raw messages; the codec decides how those look
//! on the wire. The host only needs something that implements [`Codec`].

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust values to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection's reader and writer tasks for the lifetime of the host.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or
    /// incomplete.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// One raw message is one JSON document per transport frame, which is what
/// browser peers expect.
///
/// ## Example
///
/// ```rust
/// use emitwire_protocol::{Codec, Envelope, JsonCodec};
/// use serde_json::{Value, json};
///
/// let codec = JsonCodec;
/// let raw = Envelope::encode("chat", &[json!("hi")]);
///
/// let bytes = codec.encode(&raw).unwrap();
/// assert_eq!(bytes, br#"{"emit":["chat","hi"]}"#);
///
/// let decoded: Value = codec.decode(&bytes).unwrap();
/// assert_eq!(decoded, raw);
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
