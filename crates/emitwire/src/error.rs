//! Unified error type for emitwire.

use emitwire_host::HostError;
use emitwire_protocol::ProtocolError;
use emitwire_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The envelope layer itself never fails: malformed envelopes are plain
/// data and reserved names are dropped. What can fail is the plumbing
/// around it, and the `#[from]` variants let `?` lift those errors.
#[derive(Debug, thiserror::Error)]
pub enum EmitwireError {
    /// A transport-level error (write after end, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (raw message encode/decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A host-level error (bind, connect, socket reuse).
    #[error(transparent)]
    Host(#[from] HostError),
}
