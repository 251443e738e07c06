//! Per-connection pump: moves raw messages between a transport connection
//! and a [`Peer`].
//!
//! Each connection gets two tasks:
//!   1. Writer: drains the peer's outbox, encodes, sends. Closes the
//!      transport once the outbox is closed (the peer ended).
//!   2. Reader (this future): receives, decodes, hands each message to
//!      [`Peer::receive`] in arrival order.

use std::sync::Arc;

use emitwire_protocol::Codec;
use emitwire_transport::{Connection, TransportError};
use serde_json::Value;

use crate::peer::Outbox;
use crate::Peer;

/// Drives `conn` for `peer` until the remote side closes or fails.
///
/// Ends the peer before returning, so queued writes are flushed and the
/// writer task closes the transport.
pub(crate) async fn drive<C, K>(
    conn: C,
    peer: Arc<Peer>,
    outbox: Outbox,
    codec: Arc<K>,
) -> Result<(), TransportError>
where
    C: Connection<Error = TransportError>,
    K: Codec,
{
    let conn = Arc::new(conn);
    let conn_id = peer.id();

    let writer = tokio::spawn(write_loop(
        Arc::clone(&conn),
        outbox,
        Arc::clone(&codec),
        peer.id(),
    ));

    let result = loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break Ok(());
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break Err(e);
            }
        };

        let raw: Value = match codec.decode(&data) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "dropping undecodable frame");
                continue;
            }
        };

        peer.receive(raw);
    };

    peer.end();
    if let Err(e) = writer.await {
        tracing::debug!(%conn_id, error = %e, "writer task failed");
    }
    result
}

async fn write_loop<C, K>(
    conn: Arc<C>,
    mut outbox: Outbox,
    codec: Arc<K>,
    conn_id: emitwire_transport::ConnectionId,
) where
    C: Connection<Error = TransportError>,
    K: Codec,
{
    while let Some(raw) = outbox.recv().await {
        let bytes = match codec.encode(&raw) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "dropping unencodable message");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            return;
        }
    }

    // Outbox closed: the peer ended. Tell the remote side.
    if let Err(e) = conn.close().await {
        tracing::trace!(%conn_id, error = %e, "close after end failed");
    }
}
