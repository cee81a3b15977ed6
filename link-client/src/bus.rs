//! Event bus for client events.
//!
//! Handlers are plain synchronous callbacks. [`EventBus::dispatch`] snapshots
//! the registry and invokes handlers outside the lock, so a handler may remove
//! itself (or others) from inside its own callback. A handler removed while a
//! dispatch is in flight can still see that one event.

use link_types::ClientEvent;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Token returned when a handler is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u32);

impl HandlerId {
    /// The numeric value of this token.
    pub fn value(&self) -> u32 {
        self.0
    }
}

type Handler = Arc<dyn Fn(&ClientEvent) + Send + Sync>;

/// Typed publish/subscribe registry for [`ClientEvent`]s.
#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU32,
    handlers: RwLock<Vec<(HandlerId, Handler)>>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a token without registering anything yet.
    ///
    /// Lets a subscriber that needs its own token build itself before it is
    /// registered with [`add_handler_with_id`](Self::add_handler_with_id).
    pub fn next_handler_id(&self) -> HandlerId {
        HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Register a handler and return its token.
    pub fn add_handler<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        let id = self.next_handler_id();
        self.add_handler_with_id(id, handler);
        id
    }

    /// Register a handler under a token from [`next_handler_id`](Self::next_handler_id).
    pub fn add_handler_with_id<F>(&self, id: HandlerId, handler: F)
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        handlers.push((id, Arc::new(handler)));
    }

    /// Remove a handler. Returns false if it was not registered.
    pub fn remove_handler(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        handlers.len() != before
    }

    /// Invoke every registered handler with the event, in registration order.
    pub fn dispatch(&self, event: &ClientEvent) {
        let snapshot: Vec<Handler> = {
            let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
            handlers.iter().map(|(_, h)| Arc::clone(h)).collect()
        };
        tracing::trace!(handlers = snapshot.len(), ?event, "dispatching event");
        for handler in snapshot {
            handler(event);
        }
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handler_count())
            .finish()
    }
}
