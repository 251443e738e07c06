//! Extension points of a host: the incoming transform chain and the emit
//! layer.
//!
//! Every raw message a connection receives passes through the incoming
//! transforms before the connection raises `data`. Any transform can claim
//! the message by returning [`Flow::Suppress`], which stops the chain and
//! skips the `data` event.
//!
//! Every [`Peer::emit`](crate::Peer::emit) call goes through the current
//! [`EmitLayer`]. Plugins change what `emit` means by wrapping the layer
//! that was installed before them, never by replacing shared state.
//!
//! A hub and all of its connections share one [`Pipeline`]; a standalone
//! client socket has its own.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use emitwire_transport::TransportError;
use serde_json::Value;

use crate::{Hub, Peer};

/// The object a transform is being run for.
///
/// Passed explicitly so a transform can refuse to act when it is invoked
/// for something it was not installed on.
#[derive(Clone, Copy)]
pub enum Receiver<'a> {
    /// A connection received the message.
    Peer(&'a Peer),
    /// The hub itself is the receiver.
    ///
    /// The host never delivers messages to a hub; like `Foreign`, this is
    /// for callers that run a pipeline from outside the delivery path.
    Hub(&'a Hub),
    /// Anything else: a caller outside the host's own delivery path.
    Foreign,
}

impl fmt::Debug for Receiver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Peer(peer) => write!(f, "Peer({})", peer.id()),
            Self::Hub(hub) => write!(f, "Hub({})", hub.id()),
            Self::Foreign => f.write_str("Foreign"),
        }
    }
}

/// What should happen to a raw message after a transform looked at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep going: later transforms run, then `data` is raised.
    Continue,
    /// The message was claimed: stop here and do not raise `data`.
    Suppress,
}

/// One raw message on its way through the transform chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// The decoded raw message. Transforms may rewrite it.
    pub data: Value,
}

/// A hook run for every raw incoming message, ahead of `data`.
pub trait IncomingTransform: Send + Sync + 'static {
    /// Inspects (and possibly rewrites) `packet` received by `receiver`.
    fn incoming(&self, receiver: Receiver<'_>, packet: &mut Packet) -> Flow;
}

/// What `emit` does on a connection.
pub trait EmitLayer: Send + Sync + 'static {
    /// Handles `peer.emit(event, args)`.
    ///
    /// # Errors
    /// Returns the transport error of a failed write, unchanged.
    fn emit(
        &self,
        peer: &Peer,
        event: &str,
        args: &[Value],
    ) -> Result<bool, TransportError>;
}

/// The layer every pipeline starts with: plain local dispatch.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEmit;

impl EmitLayer for NativeEmit {
    fn emit(
        &self,
        peer: &Peer,
        event: &str,
        args: &[Value],
    ) -> Result<bool, TransportError> {
        Ok(peer.emit_native(event, args))
    }
}

/// Incoming transforms plus the current emit layer.
pub struct Pipeline {
    incoming: RwLock<Vec<Arc<dyn IncomingTransform>>>,
    emit: RwLock<Arc<dyn EmitLayer>>,
}

impl Pipeline {
    /// A pipeline with no transforms and native emit.
    pub fn new() -> Self {
        Self {
            incoming: RwLock::new(Vec::new()),
            emit: RwLock::new(Arc::new(NativeEmit)),
        }
    }

    /// Appends a transform to the incoming chain.
    pub fn add_incoming(&self, transform: Arc<dyn IncomingTransform>) {
        self.incoming
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(transform);
    }

    /// Number of installed incoming transforms.
    pub fn incoming_len(&self) -> usize {
        self.incoming
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Runs the incoming chain for `packet` as received by `receiver`.
    ///
    /// Stops at the first transform that returns [`Flow::Suppress`].
    pub fn run_incoming(&self, receiver: Receiver<'_>, packet: &mut Packet) -> Flow {
        // Snapshot so transforms can install further transforms.
        let chain: Vec<Arc<dyn IncomingTransform>> = self
            .incoming
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for transform in chain {
            if transform.incoming(receiver, packet) == Flow::Suppress {
                return Flow::Suppress;
            }
        }
        Flow::Continue
    }

    /// Replaces the emit layer with one built around the current layer.
    pub fn wrap_emit<F>(&self, wrap: F)
    where
        F: FnOnce(Arc<dyn EmitLayer>) -> Arc<dyn EmitLayer>,
    {
        let mut slot = self.emit.write().unwrap_or_else(PoisonError::into_inner);
        let inner = Arc::clone(&slot);
        *slot = wrap(inner);
    }

    /// The emit layer currently in effect.
    pub fn emit_layer(&self) -> Arc<dyn EmitLayer> {
        Arc::clone(&self.emit.read().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("incoming", &self.incoming_len())
            .finish_non_exhaustive()
    }
}
