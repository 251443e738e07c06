//! Echo over named events.
//!
//! One broadcast hub answers every `ping` with a `pong` carrying the same
//! arguments, sent back to the connection that asked. Every other raw
//! message is logged with its sender.
//!
//! ```text
//! cargo run -p echo -- serve 127.0.0.1:8080
//! cargo run -p echo -- ping ws://127.0.0.1:8080 hello
//! ```

use std::sync::Arc;
use std::time::Duration;

use emitwire::prelude::*;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Server side
// ---------------------------------------------------------------------------

/// A broadcast hub that answers `ping` with `pong`.
fn echo_hub() -> Arc<Hub> {
    let hub = Hub::new(HubConfig::default());
    install(&hub, Routing::Broadcast);

    hub.on("ping", |hub, args| {
        let Some(peer) = args.first().and_then(connection_id).and_then(|id| hub.peer(id))
        else {
            return;
        };
        if let Err(e) = peer.emit("pong", &args[1..]) {
            tracing::warn!(conn_id = %peer.id(), error = %e, "pong not sent");
        }
    });
    hub.on(DATA_EVENT, |_, args| {
        if let [from, payload] = args {
            tracing::debug!(%from, %payload, "raw message");
        }
    });
    hub.on(CONNECTION_EVENT, |_, args| {
        tracing::info!(conn = %args[0], "joined");
    });
    hub.on(DISCONNECTION_EVENT, |_, args| {
        tracing::info!(conn = %args[0], "left");
    });
    hub
}

async fn serve(addr: &str) -> Result<(), EmitwireError> {
    let server = Server::bind(addr, echo_hub()).await?;
    tracing::info!(addr = ?server.local_addr(), "echo server listening");
    server.run().await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Client side
// ---------------------------------------------------------------------------

/// Sends one `ping` and waits for the matching `pong`.
async fn ping(url: &str, args: Vec<Value>) -> Result<Option<Vec<Value>>, EmitwireError> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let socket = Socket::new(SocketConfig::default());
    install(&socket, Routing::PointToPoint);
    socket.on("pong", move |_, args| {
        let _ = tx.send(args.to_vec());
    });

    socket.connect(url).await?;
    socket.emit("ping", &args)?;

    let reply = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .ok()
        .flatten();
    if tokio::time::timeout(Duration::from_secs(1), socket.close()).await.is_err() {
        tracing::debug!("close handshake timed out");
    }
    Ok(reply)
}

#[tokio::main]
async fn main() -> Result<(), EmitwireError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut argv = std::env::args().skip(1);
    match argv.next().as_deref() {
        Some("ping") => {
            let url = argv.next().unwrap_or_else(|| "ws://127.0.0.1:8080".into());
            let args: Vec<Value> = argv.map(|a| json!(a)).collect();
            match ping(&url, args).await? {
                Some(reply) => tracing::info!(?reply, "pong"),
                None => tracing::warn!("no pong within 5s"),
            }
        }
        Some("serve") | None => {
            let addr = argv.next().unwrap_or_else(|| "127.0.0.1:8080".into());
            serve(&addr).await?;
        }
        Some(other) => {
            eprintln!("unknown command {other:?}; expected `serve` or `ping`");
        }
    }
    Ok(())
}
