//! Dispatch sinks: where `put` effects deliver their events.

use std::sync::{Mutex, PoisonError};

use serde_json::Value;

/// The host's event sink. Whatever it returns becomes the `put` result.
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, event: Value) -> Value;
}

impl<F> Dispatch for F
where
    F: Fn(Value) -> Value + Send + Sync,
{
    fn dispatch(&self, event: Value) -> Value {
        self(event)
    }
}

// ---------------------------------------------------------------------------
// MemoryDispatchSink (tests and demos)
// ---------------------------------------------------------------------------

/// Records every dispatched event in order and returns `null`.
#[derive(Default)]
pub struct MemoryDispatchSink {
    events: Mutex<Vec<Value>>,
}

impl MemoryDispatchSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything dispatched so far, oldest first.
    pub fn events(&self) -> Vec<Value> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events whose `type` field equals `event_type`.
    pub fn events_of_type(&self, event_type: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter(|event| event.get("type").and_then(Value::as_str) == Some(event_type))
            .collect()
    }
}

impl Dispatch for MemoryDispatchSink {
    fn dispatch(&self, event: Value) -> Value {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        Value::Null
    }
}
