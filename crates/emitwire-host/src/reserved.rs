//! The names a host dispatches for its own structural purposes.

use std::collections::BTreeSet;

/// Event names the host raises itself on connections and hubs.
///
/// Nothing layered on top of a host may send these over the network or
/// raise them on behalf of a remote peer: doing so would let a peer fake
/// lifecycle events such as `end` or `connection`.
pub const DEFAULT_RESERVED: &[&str] = &[
    "close",
    "connection",
    "data",
    "disconnection",
    "end",
    "error",
    "heartbeat",
    "initialised",
    "log",
    "offline",
    "online",
    "open",
    "plugin",
    "plugout",
    "readyStateChange",
    "reconnect",
    "timeout",
];

/// Prefixes of the per-message transform events.
pub const RESERVED_PREFIXES: &[&str] = &["incoming::", "outgoing::"];

/// The reserved-name set of one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedEvents {
    names: BTreeSet<String>,
    prefixes: Vec<String>,
}

impl ReservedEvents {
    /// A set with no reserved names at all.
    pub fn empty() -> Self {
        Self {
            names: BTreeSet::new(),
            prefixes: Vec::new(),
        }
    }

    /// Adds `name` to the set.
    pub fn with(mut self, name: impl Into<String>) -> Self {
        self.insert(name);
        self
    }

    /// Adds `name` to the set.
    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    /// Whether `name` is used by the host itself.
    pub fn is_reserved(&self, name: &str) -> bool {
        self.names.contains(name)
            || self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }
}

impl Default for ReservedEvents {
    fn default() -> Self {
        Self {
            names: DEFAULT_RESERVED.iter().map(|s| (*s).to_owned()).collect(),
            prefixes: RESERVED_PREFIXES.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}
