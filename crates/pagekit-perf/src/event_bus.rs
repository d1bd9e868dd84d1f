//! Event Bus
//!
//! Synchronous publish/subscribe keyed by event name.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use crate::timing::lock;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct ListenerTable<T> {
    next_id: u64,
    listeners: HashMap<String, Vec<(u64, Listener<T>)>>,
}

impl<T> ListenerTable<T> {
    fn remove(&mut self, event: &str, id: u64) {
        if let Some(list) = self.listeners.get_mut(event) {
            list.retain(|(listener_id, _)| *listener_id != id);
            if list.is_empty() {
                self.listeners.remove(event);
            }
        }
    }
}

/// Publish/subscribe registry
pub struct EventBus<T> {
    table: Arc<Mutex<ListenerTable<T>>>,
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self { table: Arc::clone(&self.table) }
    }
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventBus<T> {
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(ListenerTable {
                next_id: 0,
                listeners: HashMap::new(),
            })),
        }
    }

    pub fn listener_count(&self, event: &str) -> usize {
        lock(&self.table).listeners.get(event).map_or(0, Vec::len)
    }
}

impl<T: 'static> EventBus<T> {
    /// Register `callback` under `event`.
    ///
    /// Dropping the returned [`Subscription`] leaves the callback registered;
    /// call [`Subscription::unsubscribe`] to remove it.
    pub fn subscribe(&self, event: &str, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut table = lock(&self.table);
            let id = table.next_id;
            table.next_id += 1;
            table
                .listeners
                .entry(event.to_string())
                .or_default()
                .push((id, Arc::new(callback)));
            id
        };

        let table: Weak<Mutex<ListenerTable<T>>> = Arc::downgrade(&self.table);
        let event = event.to_string();
        Subscription {
            remove: Some(Box::new(move || {
                if let Some(table) = table.upgrade() {
                    lock(&table).remove(&event, id);
                }
            })),
        }
    }

    /// Deliver `data` to every listener of `event` in registration order.
    ///
    /// Listeners added or removed during delivery take effect on the next
    /// publish. A panicking listener is logged and skipped. Returns the
    /// number of listeners that completed.
    pub fn publish(&self, event: &str, data: &T) -> usize {
        let snapshot: Vec<Listener<T>> = match lock(&self.table).listeners.get(event) {
            Some(list) => list.iter().map(|(_, l)| Arc::clone(l)).collect(),
            None => return 0,
        };

        let mut completed = 0;
        for listener in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(data))) {
                Ok(()) => completed += 1,
                Err(_) => tracing::warn!(event, "event listener panicked"),
            }
        }
        completed
    }
}

/// Removes one listener from its bus
///
/// Dropping it does not unsubscribe; the listener stays registered.
#[must_use = "without the subscription the listener can never be removed"]
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Safe to call more than once
    pub fn unsubscribe(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }

    pub fn is_active(&self) -> bool {
        self.remove.is_some()
    }
}

static GLOBAL_BUS: OnceLock<EventBus<serde_json::Value>> = OnceLock::new();

/// Process-wide bus
pub fn global_bus() -> &'static EventBus<serde_json::Value> {
    GLOBAL_BUS.get_or_init(EventBus::new)
}
