//! Wire protocol for emitwire.
//!
//! This crate defines what travels between two peers:
//!
//! - **Raw messages** are [`serde_json::Value`]s, turned into frame bytes
//!   by a [`Codec`] ([`JsonCodec`] by default).
//! - **Envelopes** ([`Envelope`]) are the convention that lets a named
//!   event with arguments ride inside an ordinary raw message.
//! - **Errors** ([`ProtocolError`]) are what can go wrong in the codec.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Codec (raw Value) → Envelope (event + args)
//! ```
//!
//! The protocol layer knows nothing about connections or listeners.

mod codec;
mod envelope;
mod error;

pub use codec::{Codec, JsonCodec};
pub use envelope::{EMIT_FIELD, Envelope};
pub use error::ProtocolError;
