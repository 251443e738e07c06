//! [`Server`]: binds a WebSocket transport and feeds every accepted
//! connection into a [`Hub`].
//!
//! Install plugins and listeners on the hub before calling
//! [`run`](Server::run) so the first message of every connection already
//! goes through them.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use emitwire_protocol::{Codec, JsonCodec};
use emitwire_transport::{Connection, Transport, WebSocketTransport};

use crate::{Hub, HostError, pump};

/// Pause after a failed accept, so a persistent error (e.g. `EMFILE`)
/// does not spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// A bound server that has not started accepting yet.
pub struct Server<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    hub: Arc<Hub>,
    codec: Arc<C>,
}

impl Server<JsonCodec> {
    /// Binds to `addr` with the JSON codec.
    pub async fn bind(addr: &str, hub: Arc<Hub>) -> Result<Self, HostError> {
        Self::bind_with_codec(addr, hub, JsonCodec).await
    }
}

impl<C: Codec> Server<C> {
    /// Binds to `addr` with a custom raw-message codec.
    pub async fn bind_with_codec(
        addr: &str,
        hub: Arc<Hub>,
        codec: C,
    ) -> Result<Self, HostError> {
        let transport = WebSocketTransport::bind(addr).await?;
        Ok(Self {
            transport,
            hub,
            codec: Arc::new(codec),
        })
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// The hub connections are attached to.
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Runs the accept loop until the process is terminated.
    ///
    /// Each accepted connection is attached to the hub and pumped on its
    /// own task; it is detached when the remote side goes away.
    pub async fn run(mut self) -> Result<(), HostError> {
        tracing::info!(hub = %self.hub.id(), "emitwire server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let (peer, outbox) = self.hub.attach_with_id(conn.id());
                    let hub = Arc::clone(&self.hub);
                    let codec = Arc::clone(&self.codec);
                    tokio::spawn(async move {
                        let conn_id = peer.id();
                        if let Err(e) = pump::drive(conn, peer, outbox, codec).await {
                            tracing::debug!(
                                %conn_id,
                                error = %e,
                                "connection ended with error"
                            );
                        }
                        hub.detach(conn_id);
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }
}
