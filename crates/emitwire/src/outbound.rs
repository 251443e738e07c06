//! The outbound side: `emit` becomes a network write.

use std::sync::Arc;

use emitwire_host::{EmitLayer, Peer};
use emitwire_protocol::Envelope;
use emitwire_transport::TransportError;
use serde_json::Value;

use crate::guard;

/// Emit layer that sends non-reserved events to the remote side.
///
/// Holds the layer it replaced. Reserved names are handed to it
/// unchanged; everything else is written as one envelope and never
/// dispatched locally.
pub struct EnvelopeEmit {
    inner: Arc<dyn EmitLayer>,
}

impl EnvelopeEmit {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn EmitLayer>) -> Self {
        Self { inner }
    }
}

impl EmitLayer for EnvelopeEmit {
    fn emit(
        &self,
        peer: &Peer,
        event: &str,
        args: &[Value],
    ) -> Result<bool, TransportError> {
        if guard::is_reserved(|name| peer.is_reserved(name), event) {
            return self.inner.emit(peer, event, args);
        }

        tracing::trace!(conn_id = %peer.id(), event, args = args.len(), "emit over wire");
        peer.write(Envelope::encode(event, args))?;
        Ok(true)
    }
}
