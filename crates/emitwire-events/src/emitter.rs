//! The listener registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::{NEW_LISTENER, REMOVE_LISTENER};

/// A listener callback.
///
/// Receives the emitting context (the connection or hub the event was
/// raised on) and the event's positional arguments.
pub type Listener<Ctx> = Arc<dyn Fn(&Ctx, &[Value]) + Send + Sync>;

/// Handle returned by [`Emitter::on`], used to remove that listener later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Entry<Ctx> {
    id: ListenerId,
    once: bool,
    listener: Listener<Ctx>,
}

// Manual impl: deriving would demand `Ctx: Clone`.
impl<Ctx> Clone for Entry<Ctx> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            once: self.once,
            listener: Arc::clone(&self.listener),
        }
    }
}

/// A registry of named listeners for one context type.
///
/// `Emitter` does not store its context. Every call that can dispatch
/// takes the context explicitly, which is what listeners receive as their
/// first parameter.
pub struct Emitter<Ctx> {
    listeners: Mutex<HashMap<String, Vec<Entry<Ctx>>>>,
    next_id: AtomicU64,
}

impl<Ctx> Emitter<Ctx> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers `listener` for `event`.
    pub fn on<F>(&self, ctx: &Ctx, event: &str, listener: F) -> ListenerId
    where
        F: Fn(&Ctx, &[Value]) + Send + Sync + 'static,
    {
        self.add(ctx, event, Arc::new(listener), false)
    }

    /// Registers `listener` for the next `event` only.
    ///
    /// The listener is removed before it runs.
    pub fn once<F>(&self, ctx: &Ctx, event: &str, listener: F) -> ListenerId
    where
        F: Fn(&Ctx, &[Value]) + Send + Sync + 'static,
    {
        self.add(ctx, event, Arc::new(listener), true)
    }

    /// Removes one listener. Returns `false` if it was not registered.
    pub fn off(&self, ctx: &Ctx, event: &str, id: ListenerId) -> bool {
        let removed = {
            let mut map = self.lock();
            let Some(list) = map.get_mut(event) else {
                return false;
            };
            let before = list.len();
            list.retain(|e| e.id != id);
            let removed = list.len() != before;
            if list.is_empty() {
                map.remove(event);
            }
            removed
        };

        if removed {
            self.notify_removed(ctx, event, 1);
        }
        removed
    }

    /// Removes every listener for `event`, or for all events when `None`.
    ///
    /// Returns the number of listeners removed.
    pub fn remove_all(&self, ctx: &Ctx, event: Option<&str>) -> usize {
        let drained: Vec<(String, usize)> = {
            let mut map = self.lock();
            match event {
                Some(name) => map
                    .remove(name)
                    .map(|list| vec![(name.to_owned(), list.len())])
                    .unwrap_or_default(),
                None => map.drain().map(|(k, list)| (k, list.len())).collect(),
            }
        };

        let mut total = 0;
        for (name, count) in drained {
            self.notify_removed(ctx, &name, count);
            total += count;
        }
        total
    }

    /// Runs every listener for `event` with `args`.
    ///
    /// Returns `true` if at least one listener ran.
    pub fn emit(&self, ctx: &Ctx, event: &str, args: &[Value]) -> bool {
        let snapshot: Vec<Entry<Ctx>> = {
            let mut map = self.lock();
            let Some(list) = map.get_mut(event) else {
                return false;
            };
            let snapshot = list.clone();
            list.retain(|e| !e.once);
            if list.is_empty() {
                map.remove(event);
            }
            snapshot
        };

        let fired_once = snapshot.iter().filter(|e| e.once).count();
        if fired_once > 0 {
            self.notify_removed(ctx, event, fired_once);
        }

        tracing::trace!(event, listeners = snapshot.len(), "dispatching");
        for entry in &snapshot {
            (entry.listener)(ctx, args);
        }
        !snapshot.is_empty()
    }

    /// Number of listeners currently registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.lock().get(event).map_or(0, Vec::len)
    }

    /// Names that currently have at least one listener.
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn add(
        &self,
        ctx: &Ctx,
        event: &str,
        listener: Listener<Ctx>,
        once: bool,
    ) -> ListenerId {
        self.emit(ctx, NEW_LISTENER, &[Value::String(event.to_owned())]);

        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock()
            .entry(event.to_owned())
            .or_default()
            .push(Entry { id, once, listener });
        id
    }

    fn notify_removed(&self, ctx: &Ctx, event: &str, count: usize) {
        let args = [Value::String(event.to_owned())];
        for _ in 0..count {
            self.emit(ctx, REMOVE_LISTENER, &args);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Entry<Ctx>>>> {
        // A panicking listener never runs under the lock, so the map is
        // always consistent even if poisoned.
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<Ctx> Default for Emitter<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx> fmt::Debug for Emitter<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("events", &self.event_names())
            .finish()
    }
}
