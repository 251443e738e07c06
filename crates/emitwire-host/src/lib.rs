//! Connection hosting for emitwire.
//!
//! This crate is the "connection abstraction" the event layer plugs into:
//!
//! - [`Peer`] — one connection: identity, local listeners, outbox
//! - [`Hub`] — the server-side connection set and its shared dispatcher
//! - [`Pipeline`] — incoming transforms and the emit layer, the two
//!   extension points plugins use
//! - [`ReservedEvents`] — names the host dispatches for itself
//! - [`Server`] / [`Socket`] — WebSocket server and client wiring
//!
//! # How it fits in the stack
//!
//! ```text
//! emitwire (above)       ← installs a transform and wraps emit
//!     ↕
//! Host (this crate)      ← peers, hubs, per-connection pumps
//!     ↕
//! Protocol + Transport   ← raw JSON messages over WebSocket frames
//! ```

mod error;
mod hub;
mod peer;
mod pipeline;
mod pump;
mod reserved;
mod server;
mod socket;

pub use error::HostError;
pub use hub::{CONNECTION_EVENT, DISCONNECTION_EVENT, Hub, HubConfig, HubId};
pub use peer::{DATA_EVENT, END_EVENT, Outbox, Peer};
pub use pipeline::{
    EmitLayer, Flow, IncomingTransform, NativeEmit, Packet, Pipeline, Receiver,
};
pub use reserved::{DEFAULT_RESERVED, RESERVED_PREFIXES, ReservedEvents};
pub use server::Server;
pub use socket::{Socket, SocketConfig};
