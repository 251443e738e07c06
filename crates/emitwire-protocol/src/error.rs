//! Error types for the protocol layer.
//!
//! Only the raw message codec can fail. Envelope decoding never errors: a
//! value that does not have the envelope shape is simply an ordinary
//! payload.

/// Errors that can occur while turning raw messages into bytes and back.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a value into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a value).
    ///
    /// Common causes: malformed JSON or a truncated frame.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
