//! The handler registry.

use parking_lot::RwLock;

use crate::handler::Handler;

/// Append-only, ordered list of handlers.
///
/// Registration order is match priority. There is no removal operation, so
/// an index returned by [`register`](Self::register) stays valid for the
/// lifetime of the registry.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: RwLock<Vec<Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler and returns its 0-based index.
    pub fn register(&self, handler: Handler) -> usize {
        let mut handlers = self.handlers.write();
        handlers.push(handler);
        handlers.len() - 1
    }

    /// Returns the handler at `index`.
    pub fn get(&self, index: usize) -> Option<Handler> {
        self.handlers.read().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// A point-in-time copy of every handler, in registration order.
    pub fn snapshot(&self) -> Vec<Handler> {
        self.handlers.read().clone()
    }

    /// A point-in-time copy of the persistent handlers, in registration order.
    pub fn persistent(&self) -> Vec<Handler> {
        self.handlers
            .read()
            .iter()
            .filter(|h| h.is_persistent())
            .cloned()
            .collect()
    }
}
