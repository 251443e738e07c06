//! The inbound side: envelopes become local events.

use emitwire_host::{Flow, IncomingTransform, Packet, Receiver};
use emitwire_protocol::Envelope;

use crate::guard;
use crate::router::Router;

/// Incoming transform that claims envelopes and redispatches them.
///
/// For each raw message on a bound connection:
///
/// 1. Wrong receiver → no-op, `data` proceeds.
/// 2. Not an envelope → no-op, `data` proceeds.
/// 3. Reserved event name → not redispatched, `data` suppressed.
/// 4. Otherwise → redispatched through the router, `data` suppressed.
pub(crate) struct EnvelopeTransform<R> {
    router: R,
}

impl<R: Router> EnvelopeTransform<R> {
    pub(crate) fn new(router: R) -> Self {
        Self { router }
    }
}

impl<R: Router> IncomingTransform for EnvelopeTransform<R> {
    fn incoming(&self, receiver: Receiver<'_>, packet: &mut Packet) -> Flow {
        let Some(peer) = self.router.bind(receiver) else {
            tracing::trace!(?receiver, "envelope transform: unbound receiver");
            return Flow::Continue;
        };

        self.router.observe(peer, &packet.data);

        let Some(envelope) = Envelope::decode(&packet.data) else {
            return Flow::Continue;
        };

        let event = envelope.event_key();
        if guard::is_reserved(|name| self.router.is_reserved(peer, name), &event) {
            tracing::trace!(conn_id = %peer.id(), %event, "reserved event from remote, dropped");
            return Flow::Suppress;
        }

        tracing::trace!(conn_id = %peer.id(), %event, args = envelope.args.len(), "redispatch");
        self.router.dispatch(peer, &event, &envelope.args);
        Flow::Suppress
    }
}
