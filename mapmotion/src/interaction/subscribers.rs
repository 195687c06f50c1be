//! Subscriber registry with explicit unsubscribe handles.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    callbacks: BTreeMap<u64, Callback<T>>,
}

/// Set of callbacks notified in subscription order.
///
/// Callbacks run on the notifying task, outside the registry lock, so a
/// callback may subscribe or unsubscribe without deadlocking.
pub struct SubscriberSet<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T: 'static> SubscriberSet<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                callbacks: BTreeMap::new(),
            })),
        }
    }

    /// Registers `callback` and returns the handle that removes it.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut registry = self.registry.lock();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.callbacks.insert(id, Arc::new(callback));
            id
        };

        let weak: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.registry);
        Subscription {
            remove: Box::new(move || {
                weak.upgrade()
                    .is_some_and(|registry| registry.lock().callbacks.remove(&id).is_some())
            }),
        }
    }

    /// Calls every callback with `value`.
    pub fn notify(&self, value: &T) {
        let callbacks: Vec<Callback<T>> = self.registry.lock().callbacks.values().cloned().collect();
        for callback in callbacks {
            callback(value);
        }
    }

    /// Removes every callback. Existing handles become no-ops.
    pub fn clear(&self) {
        self.registry.lock().callbacks.clear();
    }

    pub fn len(&self) -> usize {
        self.registry.lock().callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for SubscriberSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by `on_select` / `on_hover`.
///
/// Dropping the handle keeps the callback registered.
pub struct Subscription {
    remove: Box<dyn Fn() -> bool + Send + Sync>,
}

impl Subscription {
    /// Removes the callback. Returns false if it was already removed.
    pub fn unsubscribe(&self) -> bool {
        (self.remove)()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
