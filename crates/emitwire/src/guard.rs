//! Which event names the envelope layer must leave alone.

use emitwire_events::{NEW_LISTENER, REMOVE_LISTENER};

/// Whether `name` is off limits for envelopes.
///
/// `host_reserved` is the host's own predicate. The listener lifecycle
/// names are always added: the envelope layer registers listeners on
/// connections itself, and those announcements must never become network
/// traffic.
pub fn is_reserved(host_reserved: impl FnOnce(&str) -> bool, name: &str) -> bool {
    name == NEW_LISTENER || name == REMOVE_LISTENER || host_reserved(name)
}
