//! Multicast notification channels
//!
//! An [`Event`] holds an ordered list of listeners. Raising it calls every
//! listener registered at that moment, synchronously and in registration
//! order, passing the sender and the event arguments.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

type Listener<S, T> = Arc<dyn Fn(&S, &T) + Send + Sync>;

/// Handle returned by [`Event::add_listener`], used to detach the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

/// A publish/subscribe channel raised by a sender of type `S` with payload `T`
pub struct Event<S: ?Sized, T> {
    listeners: RwLock<Vec<(ListenerHandle, Listener<S, T>)>>,
    next_id: AtomicU64,
}

impl<S: ?Sized, T> Event<S, T> {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a listener; it is called after all previously registered ones
    pub fn add_listener<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&S, &T) + Send + Sync + 'static,
    {
        let handle = ListenerHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((handle, Arc::new(listener)));
        handle
    }

    /// Detach a listener. Returns false if the handle was not registered.
    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        let before = listeners.len();
        listeners.retain(|(h, _)| *h != handle);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Call every current listener with `sender` and `args`.
    ///
    /// The listener list is snapshotted first, so listeners may add or
    /// remove listeners (or raise other events) without deadlocking.
    pub fn raise(&self, sender: &S, args: &T) {
        let snapshot: Vec<Listener<S, T>> = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, l)| l.clone())
            .collect();

        for listener in snapshot {
            listener(sender, args);
        }
    }
}

impl<S: ?Sized, T> Default for Event<S, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ?Sized, T> std::fmt::Debug for Event<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
