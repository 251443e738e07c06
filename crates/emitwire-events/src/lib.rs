//! Local event dispatch for emitwire.
//!
//! [`Emitter`] is a registry of named listeners. Connections and hubs each
//! own one and use it as their *native* dispatch: `emit` runs every
//! listener registered under a name, synchronously, in registration order.
//!
//! # Listener lifecycle events
//!
//! Registering a listener first raises [`NEW_LISTENER`] with the event name
//! as the only argument; removing one raises [`REMOVE_LISTENER`] after the
//! removal. Code that watches registrations (e.g. to lazily subscribe
//! upstream) listens on those two names.
//!
//! # Re-entrancy
//!
//! The registry lock is never held while a listener runs. A listener may
//! register, remove, or emit on the same emitter without deadlocking.

mod emitter;

pub use emitter::{Emitter, Listener, ListenerId};

/// Raised before a listener is added, with `[event_name]`.
pub const NEW_LISTENER: &str = "newListener";

/// Raised after a listener is removed, with `[event_name]`.
pub const REMOVE_LISTENER: &str = "removeListener";
