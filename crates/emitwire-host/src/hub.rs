//! The hub: the server-side set of connections and their shared dispatcher.
//!
//! A [`Hub`] owns every connection accepted for it, plus a listener
//! registry of its own. Lifecycle events are raised on that registry:
//!
//! - `connection` with `[connection_id]` when a connection is attached
//! - `disconnection` with `[connection_id]` when it is detached
//!
//! All connections of a hub share the hub's [`Pipeline`], so a plugin
//! installed on the hub applies to every connection it has or will have,
//! and to no connection of any other hub.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use emitwire_events::{Emitter, ListenerId};
use emitwire_transport::ConnectionId;
use serde_json::Value;

use crate::peer::Outbox;
use crate::{Peer, Pipeline, ReservedEvents};

/// Raised on a hub when a connection is attached.
pub const CONNECTION_EVENT: &str = "connection";

/// Raised on a hub when a connection is detached.
pub const DISCONNECTION_EVENT: &str = "disconnection";

static NEXT_HUB_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HubId(u64);

impl fmt::Display for HubId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hub-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// HubConfig
// ---------------------------------------------------------------------------

/// Configuration for a hub.
#[derive(Debug, Clone, Default)]
pub struct HubConfig {
    /// Names the hub and its connections use internally.
    pub reserved: ReservedEvents,
}

impl HubConfig {
    /// Reserves one more event name.
    pub fn reserve(mut self, name: impl Into<String>) -> Self {
        self.reserved.insert(name);
        self
    }
}

// ---------------------------------------------------------------------------
// Hub
// ---------------------------------------------------------------------------

/// A set of connections with a shared dispatcher.
pub struct Hub {
    id: HubId,
    events: Emitter<Hub>,
    peers: Mutex<HashMap<ConnectionId, Arc<Peer>>>,
    pipeline: Arc<Pipeline>,
    reserved: Arc<ReservedEvents>,
}

impl Hub {
    /// Creates an empty hub.
    pub fn new(config: HubConfig) -> Arc<Self> {
        Arc::new(Self {
            id: HubId(NEXT_HUB_ID.fetch_add(1, Ordering::Relaxed)),
            events: Emitter::new(),
            peers: Mutex::new(HashMap::new()),
            pipeline: Arc::new(Pipeline::new()),
            reserved: Arc::new(config.reserved),
        })
    }

    /// This hub's identity.
    pub fn id(&self) -> HubId {
        self.id
    }

    /// The pipeline shared by all of this hub's connections.
    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Whether the hub uses `name` internally.
    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.is_reserved(name)
    }

    /// Whether `peer` is one of this hub's connections.
    pub fn owns(&self, peer: &Peer) -> bool {
        peer.hub_id() == Some(self.id)
    }

    /// Attaches a new connection with a fresh id.
    ///
    /// The caller is responsible for draining the returned [`Outbox`].
    pub fn attach(&self) -> (Arc<Peer>, Outbox) {
        self.attach_with_id(ConnectionId::next())
    }

    pub(crate) fn attach_with_id(&self, id: ConnectionId) -> (Arc<Peer>, Outbox) {
        let (peer, outbox) = Peer::new(
            id,
            Some(self.id),
            Arc::clone(&self.pipeline),
            Arc::clone(&self.reserved),
        );
        let peer = Arc::new(peer);
        self.lock_peers().insert(id, Arc::clone(&peer));

        tracing::info!(hub = %self.id, conn_id = %id, "connection attached");
        self.events
            .emit(self, CONNECTION_EVENT, &[Value::from(id.into_inner())]);
        (peer, outbox)
    }

    /// Ends and removes a connection, raising `disconnection`.
    pub fn detach(&self, id: ConnectionId) -> Option<Arc<Peer>> {
        let peer = self.lock_peers().remove(&id)?;
        peer.end();

        tracing::info!(hub = %self.id, conn_id = %id, "connection detached");
        self.events
            .emit(self, DISCONNECTION_EVENT, &[Value::from(id.into_inner())]);
        Some(peer)
    }

    /// Looks up a connection by id.
    pub fn peer(&self, id: ConnectionId) -> Option<Arc<Peer>> {
        self.lock_peers().get(&id).cloned()
    }

    /// All current connections, ordered by id.
    pub fn peers(&self) -> Vec<Arc<Peer>> {
        let mut peers: Vec<Arc<Peer>> = self.lock_peers().values().cloned().collect();
        peers.sort_by_key(|p| p.id());
        peers
    }

    /// Number of connections.
    pub fn len(&self) -> usize {
        self.lock_peers().len()
    }

    /// Returns `true` if the hub has no connections.
    pub fn is_empty(&self) -> bool {
        self.lock_peers().is_empty()
    }

    /// Writes one raw message to every connection.
    ///
    /// Returns how many connections accepted the write.
    pub fn write_all(&self, data: &Value) -> usize {
        self.peers()
            .iter()
            .filter(|peer| match peer.write(data.clone()) {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!(conn_id = %peer.id(), error = %e, "broadcast write failed");
                    false
                }
            })
            .count()
    }

    /// Runs the hub's own listeners for `event`.
    pub fn emit(&self, event: &str, args: &[Value]) -> bool {
        self.events.emit(self, event, args)
    }

    /// Registers a listener. It receives this hub as context.
    pub fn on<F>(&self, event: &str, listener: F) -> ListenerId
    where
        F: Fn(&Hub, &[Value]) + Send + Sync + 'static,
    {
        self.events.on(self, event, listener)
    }

    /// Registers a listener for the next `event` only.
    pub fn once<F>(&self, event: &str, listener: F) -> ListenerId
    where
        F: Fn(&Hub, &[Value]) + Send + Sync + 'static,
    {
        self.events.once(self, event, listener)
    }

    /// Removes a listener.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        self.events.off(self, event, id)
    }

    /// Number of listeners for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.events.listener_count(event)
    }

    fn lock_peers(&self) -> MutexGuard<'_, HashMap<ConnectionId, Arc<Peer>>> {
        self.peers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("id", &self.id)
            .field("connections", &self.len())
            .finish_non_exhaustive()
    }
}
