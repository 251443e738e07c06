//! # emitwire
//!
//! Named events with arbitrary arguments over an existing message
//! connection.
//!
//! After [`install`], `emit("chat", &[json!("hi")])` on one end of a
//! connection raises `chat` with `["hi"]` on the other end instead of
//! locally. The event travels as an ordinary raw message:
//!
//! ```text
//! { "emit": ["chat", "hi"] }
//! ```
//!
//! The receiving side claims such messages before its `data` event fires,
//! so existing raw-message handling never sees them, while every other
//! payload keeps flowing through `data` untouched. Names the host uses
//! for itself (see [`ReservedEvents`]) are never sent and never raised on
//! behalf of a remote peer.
//!
//! ## Routing
//!
//! - [`Routing::PointToPoint`] — events are raised on the connection they
//!   arrived on; listeners get that connection as context.
//! - [`Routing::Broadcast`] — events from every connection of a hub are
//!   raised on the hub, with the connection's identity as first argument.
//!   The hub also sees every raw message as `data(identity, payload)`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use emitwire::prelude::*;
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), EmitwireError> {
//! let hub = Hub::new(HubConfig::default());
//! emitwire::install(&hub, Routing::PointToPoint);
//! hub.on(CONNECTION_EVENT, |hub, args| {
//!     let Some(peer) = args.first().and_then(connection_id).and_then(|id| hub.peer(id))
//!     else {
//!         return;
//!     };
//!     peer.on("ping", |peer, args| {
//!         let _ = peer.emit("pong", args);
//!     });
//! });
//! let server = Server::bind("127.0.0.1:8080", hub).await?;
//! tokio::spawn(server.run());
//!
//! let socket = Socket::new(SocketConfig::default());
//! emitwire::install(&socket, Routing::PointToPoint);
//! socket.on("pong", |_, args| println!("pong {args:?}"));
//! socket.connect("ws://127.0.0.1:8080").await?;
//! socket.emit("ping", &[json!(1)])?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use emitwire_host::{Hub, Peer, Socket};

mod error;
pub mod guard;
mod inbound;
mod outbound;
mod router;

pub use error::EmitwireError;
pub use outbound::EnvelopeEmit;
pub use router::{connection_id, identity};

pub use emitwire_host::{
    CONNECTION_EVENT, DATA_EVENT, DISCONNECTION_EVENT, END_EVENT, HubConfig,
    ReservedEvents, Server, SocketConfig,
};
pub use emitwire_protocol::Envelope;

use inbound::EnvelopeTransform;
use router::{Binding, Broadcast, PointToPoint};

/// How decoded events are redispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Routing {
    /// On the receiving connection, context = that connection.
    #[default]
    PointToPoint,
    /// On the hub, with the connection identity prepended.
    Broadcast,
}

/// Something the envelope layer can be installed on.
pub trait Host {
    /// Wraps emit and installs the inbound transform.
    fn install_envelopes(&self, routing: Routing);
}

/// Installs the envelope layer on `host`.
///
/// Call once per host, before traffic flows. Everything observable
/// afterwards is the wrapped `emit` and the installed transform.
pub fn install<H: Host + ?Sized>(host: &H, routing: Routing) {
    host.install_envelopes(routing);
}

impl Host for Arc<Hub> {
    fn install_envelopes(&self, routing: Routing) {
        let pipeline = self.pipeline();
        pipeline.wrap_emit(|inner| Arc::new(EnvelopeEmit::new(inner)));
        match routing {
            Routing::PointToPoint => pipeline.add_incoming(Arc::new(
                EnvelopeTransform::new(PointToPoint {
                    binding: Binding::Hub(self.id()),
                }),
            )),
            Routing::Broadcast => pipeline.add_incoming(Arc::new(
                EnvelopeTransform::new(Broadcast {
                    hub: Arc::downgrade(self),
                    hub_id: self.id(),
                }),
            )),
        }
        tracing::debug!(hub = %self.id(), ?routing, "envelopes installed");
    }
}

/// A lone connection has no hub to broadcast to: it always routes
/// point-to-point.
///
/// A hub's connection shares the hub's pipeline, so installing on it would
/// change every connection of that hub. That is refused; install on the
/// hub instead.
impl Host for Peer {
    fn install_envelopes(&self, routing: Routing) {
        if let Some(hub) = self.hub_id() {
            tracing::warn!(
                conn_id = %self.id(),
                %hub,
                ?routing,
                "connection belongs to a hub, install on the hub instead; nothing installed"
            );
            return;
        }
        if routing == Routing::Broadcast {
            tracing::debug!(conn_id = %self.id(), "lone connection routes point-to-point");
        }
        let pipeline = self.pipeline();
        pipeline.wrap_emit(|inner| Arc::new(EnvelopeEmit::new(inner)));
        pipeline.add_incoming(Arc::new(EnvelopeTransform::new(PointToPoint {
            binding: Binding::Connection(self.id()),
        })));
        tracing::debug!(conn_id = %self.id(), "envelopes installed");
    }
}

impl Host for Socket {
    fn install_envelopes(&self, routing: Routing) {
        self.peer().install_envelopes(routing);
    }
}

/// Common imports for applications.
pub mod prelude {
    pub use crate::{
        CONNECTION_EVENT, DATA_EVENT, DISCONNECTION_EVENT, EmitwireError,
        Envelope, HubConfig, ReservedEvents, Routing, Server, SocketConfig,
        connection_id, identity, install,
    };
    pub use emitwire_host::{Hub, Peer, Socket};
    pub use emitwire_transport::ConnectionId;
}

#[cfg(test)]
mod tests {
    //! In-process tests: two detached peers bridged by hand, so every
    //! message hop is explicit and synchronous.

    use std::sync::Mutex;

    use emitwire_host::{Flow, HubConfig, Outbox, Packet, Receiver};
    use serde_json::{Value, json};

    use super::*;

    type Calls = Arc<Mutex<Vec<Vec<Value>>>>;

    fn collect_peer(peer: &Peer, event: &str) -> Calls {
        let seen: Calls = Arc::default();
        let sink = Arc::clone(&seen);
        peer.on(event, move |_, args| sink.lock().unwrap().push(args.to_vec()));
        seen
    }

    fn collect_hub(hub: &Hub, event: &str) -> Calls {
        let seen: Calls = Arc::default();
        let sink = Arc::clone(&seen);
        hub.on(event, move |_, args| sink.lock().unwrap().push(args.to_vec()));
        seen
    }

    /// Moves everything queued in `outbox` into `to`.
    fn deliver(outbox: &mut Outbox, to: &Peer) -> usize {
        let mut n = 0;
        while let Ok(raw) = outbox.try_recv() {
            to.receive(raw);
            n += 1;
        }
        n
    }

    fn client() -> (Arc<Peer>, Outbox) {
        let (peer, outbox) = Peer::detached(ReservedEvents::default());
        install(&*peer, Routing::PointToPoint);
        (peer, outbox)
    }

    #[test]
    fn test_point_to_point_round_trip() {
        let (a, mut a_out) = client();
        let (b, _b_out) = client();
        let foo = collect_peer(&b, "foo");
        let data = collect_peer(&b, DATA_EVENT);

        let args = [json!(1), json!("foo"), json!({"bar": "moo"}), json!([1])];
        assert!(a.emit("foo", &args).unwrap());
        assert_eq!(deliver(&mut a_out, &b), 1);

        assert_eq!(*foo.lock().unwrap(), vec![args.to_vec()]);
        assert!(data.lock().unwrap().is_empty(), "envelope never reaches data");
    }

    #[test]
    fn test_point_to_point_context_is_receiving_connection() {
        let (a, mut a_out) = client();
        let (b, _b_out) = client();
        let expected = b.id();
        let contexts = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&contexts);
        b.on("foo", move |ctx, args| {
            sink.lock().unwrap().push((ctx.id(), args.len()));
        });

        a.emit("foo", &[]).unwrap();
        deliver(&mut a_out, &b);

        assert_eq!(*contexts.lock().unwrap(), vec![(expected, 0)]);
    }

    #[test]
    fn test_plain_payloads_pass_through_data() {
        let (b, _b_out) = client();
        let foo = collect_peer(&b, "foo");
        let data = collect_peer(&b, DATA_EVENT);

        let payloads = [
            json!({"object": "works"}),
            json!(["array", "works"]),
            json!("string works"),
            json!(1),
            json!({"emit": "foo"}),
            json!({"emit": []}),
        ];
        for raw in &payloads {
            b.receive(raw.clone());
        }

        let got: Vec<Value> = data.lock().unwrap().iter().map(|a| a[0].clone()).collect();
        assert_eq!(got, payloads.to_vec());
        assert!(foo.lock().unwrap().is_empty());
    }

    #[test]
    fn test_reserved_inbound_is_claimed_but_not_raised() {
        let (b, _b_out) = client();
        let end = collect_peer(&b, END_EVENT);
        let data = collect_peer(&b, DATA_EVENT);

        b.receive(json!({"emit": ["end", "spoofed"]}));
        b.receive(json!({"emit": ["newListener", "foo"]}));

        assert!(end.lock().unwrap().is_empty());
        assert!(data.lock().unwrap().is_empty());
        assert!(!b.is_ended());
    }

    #[test]
    fn test_reserved_outbound_stays_local() {
        let (a, mut a_out) = client();
        let end = collect_peer(&a, END_EVENT);

        assert!(a.emit(END_EVENT, &[]).unwrap());
        assert_eq!(end.lock().unwrap().len(), 1);
        assert!(a_out.try_recv().is_err());
    }

    #[test]
    fn test_transform_ignores_foreign_receivers() {
        let (a, _a_out) = client();
        let (other, _other_out) = Peer::detached(ReservedEvents::default());
        let foo = collect_peer(&a, "foo");

        let mut packet = Packet {
            data: json!({"emit": ["foo"]}),
        };
        let pipeline = a.pipeline();
        assert_eq!(pipeline.run_incoming(Receiver::Foreign, &mut packet), Flow::Continue);
        assert_eq!(
            pipeline.run_incoming(Receiver::Peer(&other), &mut packet),
            Flow::Continue
        );
        assert!(foo.lock().unwrap().is_empty());
    }

    #[test]
    fn test_hub_point_to_point_raises_on_the_connection() {
        let hub = Hub::new(HubConfig::default());
        install(&hub, Routing::PointToPoint);
        let (spark, _spark_out) = hub.attach();
        let on_spark = collect_peer(&spark, "foo");
        let on_hub = collect_hub(&hub, "foo");

        let (a, mut a_out) = client();
        a.emit("foo", &[json!(2)]).unwrap();
        deliver(&mut a_out, &spark);

        assert_eq!(*on_spark.lock().unwrap(), vec![vec![json!(2)]]);
        assert!(on_hub.lock().unwrap().is_empty());
    }

    #[test]
    fn test_hub_connections_emit_over_the_wire() {
        let hub = Hub::new(HubConfig::default());
        install(&hub, Routing::PointToPoint);
        let (spark, mut spark_out) = hub.attach();

        let (b, _b_out) = client();
        let foo = collect_peer(&b, "foo");

        spark.emit("foo", &[json!("from server")]).unwrap();
        deliver(&mut spark_out, &b);
        assert_eq!(*foo.lock().unwrap(), vec![vec![json!("from server")]]);
    }

    #[test]
    fn test_broadcast_tags_events_with_identity() {
        let hub = Hub::new(HubConfig::default());
        install(&hub, Routing::Broadcast);
        let (spark, _spark_out) = hub.attach();
        let foo = collect_hub(&hub, "foo");
        let data = collect_hub(&hub, DATA_EVENT);
        let spark_data = collect_peer(&spark, DATA_EVENT);

        let (a, mut a_out) = client();
        let args = [json!(1), json!("foo"), json!({"bar": "moo"}), json!([1])];
        a.emit("foo", &args).unwrap();
        deliver(&mut a_out, &spark);

        let id = identity(spark.id());
        let mut expected = vec![id.clone()];
        expected.extend(args.iter().cloned());
        assert_eq!(*foo.lock().unwrap(), vec![expected]);

        let raw = Envelope::encode("foo", &args);
        assert_eq!(*data.lock().unwrap(), vec![vec![id, raw]]);
        assert!(spark_data.lock().unwrap().is_empty());
    }

    #[test]
    fn test_broadcast_prefixes_plain_data_with_identity() {
        let hub = Hub::new(HubConfig::default());
        install(&hub, Routing::Broadcast);
        let (spark, _spark_out) = hub.attach();
        let data = collect_hub(&hub, DATA_EVENT);
        let foo = collect_hub(&hub, "foo");
        let spark_data = collect_peer(&spark, DATA_EVENT);

        let payloads = [
            json!({"object": "works"}),
            json!(["array", "works"]),
            json!("string works"),
            json!(1),
            json!({"emit": "foo"}),
            json!({"emit": []}),
        ];
        for raw in &payloads {
            spark.receive(raw.clone());
        }

        let id = identity(spark.id());
        let expected: Vec<Vec<Value>> = payloads
            .iter()
            .map(|raw| vec![id.clone(), raw.clone()])
            .collect();
        assert_eq!(*data.lock().unwrap(), expected);

        let passed: Vec<Value> = spark_data.lock().unwrap().iter().map(|a| a[0].clone()).collect();
        assert_eq!(passed, payloads.to_vec());
        assert!(foo.lock().unwrap().is_empty());
    }

    #[test]
    fn test_broadcast_zero_args_delivers_only_identity() {
        let hub = Hub::new(HubConfig::default());
        install(&hub, Routing::Broadcast);
        let (spark, _spark_out) = hub.attach();
        let foo = collect_hub(&hub, "foo");

        spark.receive(json!({"emit": ["foo"]}));

        let calls = foo.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], vec![identity(spark.id())]);
        assert_eq!(connection_id(&calls[0][0]), Some(spark.id()));
    }

    #[test]
    fn test_broadcast_reserved_envelope_still_raises_hub_data() {
        let hub = Hub::new(HubConfig::default());
        install(&hub, Routing::Broadcast);
        let (spark, _spark_out) = hub.attach();
        let connection = collect_hub(&hub, CONNECTION_EVENT);
        let data = collect_hub(&hub, DATA_EVENT);
        let spark_data = collect_peer(&spark, DATA_EVENT);

        spark.receive(json!({"emit": ["connection", 99]}));

        assert!(connection.lock().unwrap().is_empty());
        assert_eq!(data.lock().unwrap().len(), 1);
        assert!(spark_data.lock().unwrap().is_empty());
    }

    #[test]
    fn test_broadcast_ignores_foreign_receivers() {
        let hub = Hub::new(HubConfig::default());
        install(&hub, Routing::Broadcast);
        let other_hub = Hub::new(HubConfig::default());
        let (stranger, _stranger_out) = other_hub.attach();
        let foo = collect_hub(&hub, "foo");
        let data = collect_hub(&hub, DATA_EVENT);

        let mut packet = Packet {
            data: json!({"emit": ["foo"]}),
        };
        for receiver in [
            Receiver::Foreign,
            Receiver::Hub(&hub),
            Receiver::Peer(&stranger),
        ] {
            assert_eq!(
                hub.pipeline().run_incoming(receiver, &mut packet),
                Flow::Continue
            );
        }
        assert!(foo.lock().unwrap().is_empty());
        assert!(data.lock().unwrap().is_empty());
    }

    #[test]
    fn test_install_on_a_hub_connection_is_refused() {
        let hub = Hub::new(HubConfig::default());
        let (spark, mut spark_out) = hub.attach();
        let on_hub = collect_hub(&hub, "foo");
        let on_spark = collect_peer(&spark, "foo");
        let spark_data = collect_peer(&spark, DATA_EVENT);

        install(&*spark, Routing::Broadcast);
        install(&*spark, Routing::PointToPoint);
        assert_eq!(hub.pipeline().incoming_len(), 0);

        spark.receive(json!({"emit": ["foo", 1]}));
        assert!(on_hub.lock().unwrap().is_empty());
        assert!(on_spark.lock().unwrap().is_empty());
        assert_eq!(*spark_data.lock().unwrap(), vec![vec![json!({"emit": ["foo", 1]})]]);

        // Emit stays native on every connection of the hub.
        spark.emit("foo", &[]).unwrap();
        assert_eq!(on_spark.lock().unwrap().len(), 1);
        assert!(spark_out.try_recv().is_err());
    }

    #[test]
    fn test_install_does_not_leak_across_hubs() {
        let plain = Hub::new(HubConfig::default());
        let wired = Hub::new(HubConfig::default());
        install(&wired, Routing::PointToPoint);

        let (spark, mut spark_out) = plain.attach();
        let foo = collect_peer(&spark, "foo");
        spark.emit("foo", &[]).unwrap();

        assert_eq!(foo.lock().unwrap().len(), 1, "plain hub still dispatches locally");
        assert!(spark_out.try_recv().is_err());
        assert_eq!(plain.pipeline().incoming_len(), 0);
    }

    #[test]
    fn test_non_string_event_names_are_keyed_by_json_text() {
        let (b, _b_out) = client();
        let one = collect_peer(&b, "1");

        b.receive(json!({"emit": [1, "x"]}));
        assert_eq!(*one.lock().unwrap(), vec![vec![json!("x")]]);
    }

    #[test]
    fn test_listener_can_reply_from_inside_dispatch() {
        let (a, mut a_out) = client();
        let (b, mut b_out) = client();
        b.on("ping", |peer, args| {
            peer.emit("pong", args).unwrap();
        });
        let pong = collect_peer(&a, "pong");

        a.emit("ping", &[json!(7)]).unwrap();
        deliver(&mut a_out, &b);
        deliver(&mut b_out, &a);

        assert_eq!(*pong.lock().unwrap(), vec![vec![json!(7)]]);
    }
}
