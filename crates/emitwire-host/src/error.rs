//! Error types for the host layer.

use emitwire_transport::TransportError;

/// Errors that can occur while running hubs, servers, and sockets.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// A transport-level error (bind, accept, connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// [`Socket::connect`](crate::Socket::connect) was called twice.
    #[error("socket is already connected")]
    AlreadyConnected,
}
