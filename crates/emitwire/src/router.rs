//! Where decoded events are redispatched.
//!
//! A router answers two questions for the inbound transform: is this
//! receiver one I was installed for, and where does a decoded event go.

use std::sync::Weak;

use emitwire_host::{DATA_EVENT, Hub, HubId, Peer, Receiver};
use emitwire_transport::ConnectionId;
use serde_json::Value;

/// The connection identity as delivered to hub listeners.
pub fn identity(id: ConnectionId) -> Value {
    Value::from(id.into_inner())
}

/// Reads back an identity delivered by [`identity`].
pub fn connection_id(value: &Value) -> Option<ConnectionId> {
    value.as_u64().map(ConnectionId::new)
}

pub(crate) trait Router: Send + Sync + 'static {
    /// The connection a transform call is bound to, or `None` when the
    /// receiver is not one this router was installed for.
    fn bind<'a>(&self, receiver: Receiver<'a>) -> Option<&'a Peer>;

    /// Sees every raw message received on a bound connection.
    fn observe(&self, _peer: &Peer, _raw: &Value) {}

    /// Whether `name` is reserved where the event would be raised.
    fn is_reserved(&self, peer: &Peer, name: &str) -> bool;

    /// Raises a decoded event.
    fn dispatch(&self, peer: &Peer, event: &str, args: &[Value]);
}

// ---------------------------------------------------------------------------
// Point-to-point
// ---------------------------------------------------------------------------

/// Which connections a point-to-point transform accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Binding {
    /// Exactly this standalone connection.
    Connection(ConnectionId),
    /// Any connection of this hub.
    Hub(HubId),
}

/// Events are raised on the connection they arrived on.
pub(crate) struct PointToPoint {
    pub(crate) binding: Binding,
}

impl Router for PointToPoint {
    fn bind<'a>(&self, receiver: Receiver<'a>) -> Option<&'a Peer> {
        let Receiver::Peer(peer) = receiver else {
            return None;
        };
        let bound = match self.binding {
            Binding::Connection(id) => peer.id() == id && peer.hub_id().is_none(),
            Binding::Hub(hub) => peer.hub_id() == Some(hub),
        };
        bound.then_some(peer)
    }

    fn is_reserved(&self, peer: &Peer, name: &str) -> bool {
        peer.is_reserved(name)
    }

    fn dispatch(&self, peer: &Peer, event: &str, args: &[Value]) {
        peer.emit_native(event, args);
    }
}

// ---------------------------------------------------------------------------
// Broadcast
// ---------------------------------------------------------------------------

/// Events from every connection are raised on the hub, tagged with the
/// connection's identity.
pub(crate) struct Broadcast {
    // Weak: the transform lives in the hub's own pipeline.
    pub(crate) hub: Weak<Hub>,
    pub(crate) hub_id: HubId,
}

impl Router for Broadcast {
    fn bind<'a>(&self, receiver: Receiver<'a>) -> Option<&'a Peer> {
        match receiver {
            Receiver::Peer(peer) if peer.hub_id() == Some(self.hub_id) => Some(peer),
            _ => None,
        }
    }

    fn observe(&self, peer: &Peer, raw: &Value) {
        if let Some(hub) = self.hub.upgrade() {
            hub.emit(DATA_EVENT, &[identity(peer.id()), raw.clone()]);
        }
    }

    fn is_reserved(&self, peer: &Peer, name: &str) -> bool {
        match self.hub.upgrade() {
            Some(hub) => hub.is_reserved(name),
            None => peer.is_reserved(name),
        }
    }

    fn dispatch(&self, peer: &Peer, event: &str, args: &[Value]) {
        let Some(hub) = self.hub.upgrade() else {
            tracing::debug!(conn_id = %peer.id(), event, "hub dropped, event discarded");
            return;
        };
        let mut tagged = Vec::with_capacity(args.len() + 1);
        tagged.push(identity(peer.id()));
        tagged.extend_from_slice(args);
        hub.emit(event, &tagged);
    }
}
