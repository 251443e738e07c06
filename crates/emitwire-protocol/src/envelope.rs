//! The event envelope: how a named event with positional arguments rides
//! inside one ordinary raw message.
//!
//! ```text
//! { "emit": [ "chat", "hello", { "room": 4 } ] }
//!             ──┬───  ──────────┬──────────
//!           event name      arguments (any JSON, any count)
//! ```
//!
//! The envelope lives in a single field so it can be told apart from
//! arbitrary application payloads: anything that is not an object with an
//! array `emit` field of length ≥ 1 is plain data.

use std::borrow::Cow;

use serde_json::{Map, Value};

/// The field of a raw message that carries an envelope.
pub const EMIT_FIELD: &str = "emit";

/// A decoded event: its name and its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// The first element of the sequence. Usually a string.
    pub event: Value,
    /// Everything after the name, in order. May be empty.
    pub args: Vec<Value>,
}

impl Envelope {
    /// Creates an envelope from an event name and its arguments.
    pub fn new(event: impl Into<Value>, args: Vec<Value>) -> Self {
        Self {
            event: event.into(),
            args,
        }
    }

    /// Builds the raw message for `event` called with `args`.
    ///
    /// Arguments are passed through untouched.
    pub fn encode(event: &str, args: &[Value]) -> Value {
        let mut seq = Vec::with_capacity(args.len() + 1);
        seq.push(Value::String(event.to_owned()));
        seq.extend_from_slice(args);
        wrap(seq)
    }

    /// Converts this envelope into its raw message form.
    pub fn into_value(self) -> Value {
        let mut seq = Vec::with_capacity(self.args.len() + 1);
        seq.push(self.event);
        seq.extend(self.args);
        wrap(seq)
    }

    /// Reads an envelope out of a raw message.
    ///
    /// Returns `None` for anything that is not an object whose `emit`
    /// field is a non-empty array. Never fails otherwise.
    pub fn decode(message: &Value) -> Option<Self> {
        let seq = message.as_object()?.get(EMIT_FIELD)?.as_array()?;
        let (event, args) = seq.split_first()?;
        Some(Self {
            event: event.clone(),
            args: args.to_vec(),
        })
    }

    /// The name listeners are registered under.
    ///
    /// String names are used as-is; any other value is keyed by its
    /// compact JSON text, so `1` dispatches to listeners of `"1"`.
    pub fn event_key(&self) -> Cow<'_, str> {
        match &self.event {
            Value::String(name) => Cow::Borrowed(name.as_str()),
            other => Cow::Owned(other.to_string()),
        }
    }
}

fn wrap(seq: Vec<Value>) -> Value {
    let mut obj = Map::with_capacity(1);
    obj.insert(EMIT_FIELD.to_owned(), Value::Array(seq));
    Value::Object(obj)
}
