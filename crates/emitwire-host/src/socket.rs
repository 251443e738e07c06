//! [`Socket`]: the client end of a connection.
//!
//! A socket exists before it is connected, so plugins and listeners can be
//! installed first; writes made before [`connect`](Socket::connect) are
//! queued and flushed once the transport is up.

use std::ops::Deref;
use std::sync::{Arc, Mutex, PoisonError};

use emitwire_protocol::JsonCodec;
use emitwire_transport::WebSocketConnection;
use tokio::task::JoinHandle;

use crate::peer::Outbox;
use crate::{HostError, Peer, ReservedEvents, pump};

/// Configuration for a client socket.
#[derive(Debug, Clone, Default)]
pub struct SocketConfig {
    /// Names the socket uses internally.
    pub reserved: ReservedEvents,
}

impl SocketConfig {
    /// Reserves one more event name.
    pub fn reserve(mut self, name: impl Into<String>) -> Self {
        self.reserved.insert(name);
        self
    }
}

/// A client connection.
///
/// Dereferences to its [`Peer`], so `socket.on(..)`, `socket.emit(..)`
/// and `socket.write(..)` work directly.
pub struct Socket {
    peer: Arc<Peer>,
    outbox: Mutex<Option<Outbox>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Socket {
    /// Creates an unconnected socket.
    pub fn new(config: SocketConfig) -> Self {
        let (peer, outbox) = Peer::detached(config.reserved);
        Self {
            peer,
            outbox: Mutex::new(Some(outbox)),
            task: Mutex::new(None),
        }
    }

    /// The connection object listeners receive as context.
    pub fn peer(&self) -> &Arc<Peer> {
        &self.peer
    }

    /// Dials `url` and starts pumping messages.
    ///
    /// # Errors
    /// [`HostError::AlreadyConnected`] on a second call, or the transport
    /// error if the dial fails (the socket may then be connected again).
    pub async fn connect(&self, url: &str) -> Result<(), HostError> {
        let outbox = self
            .outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(HostError::AlreadyConnected)?;

        let conn = match WebSocketConnection::connect(url).await {
            Ok(conn) => conn,
            Err(e) => {
                *self.outbox.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(outbox);
                return Err(e.into());
            }
        };

        let peer = Arc::clone(&self.peer);
        let handle = tokio::spawn(async move {
            let conn_id = peer.id();
            if let Err(e) = pump::drive(conn, peer, outbox, Arc::new(JsonCodec)).await {
                tracing::debug!(%conn_id, error = %e, "socket ended with error");
            }
        });
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        tracing::info!(conn_id = %self.peer.id(), url, "socket connected");
        Ok(())
    }

    /// Ends the connection and waits for the pump to finish.
    pub async fn close(&self) {
        self.peer.end();
        let handle = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::debug!(error = %e, "socket pump task failed");
            }
        }
    }
}

impl Deref for Socket {
    type Target = Peer;

    fn deref(&self) -> &Peer {
        &self.peer
    }
}

impl std::fmt::Debug for Socket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Socket").field("peer", &self.peer).finish_non_exhaustive()
    }
}
