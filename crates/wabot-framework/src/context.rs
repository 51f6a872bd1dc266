//! Per-user context handed to handlers that ask for it.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use wabot_core::{BoxedMessenger, Update};

/// Context for one handler execution.
///
/// A fresh `UserContext` is built for every execution whose handler wants
/// one; nothing stored in it survives into the next update.
pub struct UserContext {
    sender_id: String,
    sender_display_name: String,
    messenger: BoxedMessenger,
    state: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl UserContext {
    /// Creates the context for the sender of `update`.
    pub fn for_update(update: &Update) -> Self {
        Self {
            sender_id: update.sender_id.clone(),
            sender_display_name: update.sender_display_name.clone(),
            messenger: update.messenger().clone(),
            state: HashMap::new(),
        }
    }

    /// The sender's phone number id.
    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    /// The sender's profile name.
    pub fn sender_display_name(&self) -> &str {
        &self.sender_display_name
    }

    /// The outbound messenger.
    pub fn messenger(&self) -> &BoxedMessenger {
        &self.messenger
    }

    /// Stores a value; one value per type, later calls overwrite.
    pub fn set_state<T: Send + Sync + 'static>(&mut self, value: T) {
        self.state.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Borrows a stored value.
    pub fn get_state<T: 'static>(&self) -> Option<&T> {
        self.state
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    /// Returns `true` if a value of type `T` is stored.
    pub fn has_state<T: 'static>(&self) -> bool {
        self.state.contains_key(&TypeId::of::<T>())
    }

    /// Removes and returns a stored value.
    pub fn take_state<T: 'static>(&mut self) -> Option<T> {
        self.state
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }
}

impl fmt::Debug for UserContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserContext")
            .field("sender_id", &self.sender_id)
            .field("state_len", &self.state.len())
            .finish_non_exhaustive()
    }
}
