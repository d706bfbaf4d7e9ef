//! Named event listeners.
//!
//! An extension point for service implementations: listeners are registered
//! per event name and invoked in registration order on `emit`. There is no
//! cap on the number of listeners. The mount lifecycle itself emits nothing.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Handle returned by [`EventEmitter::on`], used to remove a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct EventEmitter {
    listeners: HashMap<String, Vec<(ListenerId, Listener)>>,
    next_id: u64,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `event`.
    pub fn on<F>(&mut self, event: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners
            .entry(event.into())
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove one listener. Returns false if it was not registered for `event`.
    pub fn remove_listener(&mut self, event: &str, id: ListenerId) -> bool {
        let Some(listeners) = self.listeners.get_mut(event) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            self.listeners.remove(event);
        }
        removed
    }

    /// Remove every listener for `event`, returning how many were dropped.
    pub fn remove_all_listeners(&mut self, event: &str) -> usize {
        self.listeners.remove(event).map(|l| l.len()).unwrap_or(0)
    }

    /// Call every listener for `event`. Returns the number of listeners called.
    pub fn emit(&self, event: &str, payload: &Value) -> usize {
        let Some(listeners) = self.listeners.get(event) else {
            return 0;
        };
        for (_, listener) in listeners {
            listener(payload);
        }
        listeners.len()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map(Vec::len).unwrap_or(0)
    }

    pub fn event_names(&self) -> Vec<&str> {
        self.listeners.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .listeners
            .iter()
            .map(|(event, listeners)| (event.as_str(), listeners.len()))
            .collect();
        f.debug_struct("EventEmitter").field("listeners", &counts).finish()
    }
}
