//! One connection as seen by the code above the transport.
//!
//! A [`Peer`] has an identity, a local listener registry, and an outbox of
//! raw messages waiting to be written to the remote side. It never touches
//! the socket itself: a pump task (see `pump.rs`) drains the outbox into
//! the transport and feeds received messages into [`Peer::receive`].

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use emitwire_events::{Emitter, ListenerId};
use emitwire_transport::{ConnectionId, TransportError};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::pipeline::{Flow, Packet, Receiver};
use crate::{HubId, Pipeline, ReservedEvents};

/// The raw-message event a connection raises for every unclaimed message.
pub const DATA_EVENT: &str = "data";

/// Raised once on a connection when it stops accepting writes.
pub const END_EVENT: &str = "end";

/// Receiving half of a peer's outbox.
pub type Outbox = mpsc::UnboundedReceiver<Value>;

/// A single connection.
pub struct Peer {
    id: ConnectionId,
    hub: Option<HubId>,
    events: Emitter<Peer>,
    outbox: Mutex<Option<mpsc::UnboundedSender<Value>>>,
    pipeline: Arc<Pipeline>,
    reserved: Arc<ReservedEvents>,
}

impl Peer {
    pub(crate) fn new(
        id: ConnectionId,
        hub: Option<HubId>,
        pipeline: Arc<Pipeline>,
        reserved: Arc<ReservedEvents>,
    ) -> (Self, Outbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        let peer = Self {
            id,
            hub,
            events: Emitter::new(),
            outbox: Mutex::new(Some(tx)),
            pipeline,
            reserved,
        };
        (peer, rx)
    }

    /// Creates a standalone peer with its own pipeline and no transport.
    ///
    /// Everything written to it lands in the returned [`Outbox`]; whatever
    /// should arrive is handed to [`receive`](Self::receive). Useful for
    /// in-process bridges and for driving a peer without a network.
    pub fn detached(reserved: ReservedEvents) -> (Arc<Self>, Outbox) {
        let (peer, outbox) = Self::new(
            ConnectionId::next(),
            None,
            Arc::new(Pipeline::new()),
            Arc::new(reserved),
        );
        (Arc::new(peer), outbox)
    }

    /// This connection's identity.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The hub this connection belongs to, if any.
    pub fn hub_id(&self) -> Option<HubId> {
        self.hub
    }

    /// The pipeline this connection runs messages through.
    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Whether the host uses `name` internally.
    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.is_reserved(name)
    }

    /// Queues one raw message for the remote side.
    ///
    /// # Errors
    /// Returns [`TransportError::ConnectionClosed`] once the connection has
    /// ended.
    pub fn write(&self, data: Value) -> Result<(), TransportError> {
        let outbox = self.outbox();
        let Some(tx) = outbox.as_ref() else {
            return Err(TransportError::ConnectionClosed(format!(
                "{} has ended",
                self.id
            )));
        };
        tx.send(data).map_err(|_| {
            TransportError::ConnectionClosed(format!("{} writer is gone", self.id))
        })
    }

    /// Emits `event` through the pipeline's current emit layer.
    ///
    /// Without plugins this is local dispatch.
    ///
    /// # Errors
    /// Whatever the emit layer's write reports.
    pub fn emit(&self, event: &str, args: &[Value]) -> Result<bool, TransportError> {
        self.pipeline.emit_layer().emit(self, event, args)
    }

    /// Runs local listeners for `event`, bypassing the emit layer.
    pub fn emit_native(&self, event: &str, args: &[Value]) -> bool {
        self.events.emit(self, event, args)
    }

    /// Registers a listener. It receives this connection as context.
    pub fn on<F>(&self, event: &str, listener: F) -> ListenerId
    where
        F: Fn(&Peer, &[Value]) + Send + Sync + 'static,
    {
        self.events.on(self, event, listener)
    }

    /// Registers a listener for the next `event` only.
    pub fn once<F>(&self, event: &str, listener: F) -> ListenerId
    where
        F: Fn(&Peer, &[Value]) + Send + Sync + 'static,
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

    /// Delivers one raw message that arrived from the remote side.
    ///
    /// Runs the incoming transforms, then raises `data` with the (possibly
    /// rewritten) message unless a transform claimed it.
    pub fn receive(&self, data: Value) {
        let mut packet = Packet { data };
        match self.pipeline.run_incoming(Receiver::Peer(self), &mut packet) {
            Flow::Suppress => {
                tracing::trace!(conn_id = %self.id, "message claimed by transform");
            }
            Flow::Continue => {
                self.events.emit(self, DATA_EVENT, &[packet.data]);
            }
        }
    }

    /// Stops accepting writes and raises `end`.
    ///
    /// Messages already queued are still flushed by the pump. Returns
    /// `false` if the connection had already ended.
    pub fn end(&self) -> bool {
        let was_open = self.outbox().take().is_some();
        if was_open {
            tracing::debug!(conn_id = %self.id, "connection ended");
            self.events.emit(self, END_EVENT, &[]);
        }
        was_open
    }

    /// Whether [`end`](Self::end) has been called.
    pub fn is_ended(&self) -> bool {
        self.outbox().is_none()
    }

    fn outbox(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<Value>>> {
        self.outbox.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer")
            .field("id", &self.id)
            .field("hub", &self.hub)
            .field("ended", &self.is_ended())
            .finish_non_exhaustive()
    }
}
