//! The intake queue.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tracing::warn;

use wabot_core::RawUpdate;

/// FIFO buffer absorbing bursts of updates.
///
/// Not durable: whatever is queued is lost with the process.
#[derive(Debug, Default)]
pub struct IntakeQueue {
    items: Mutex<VecDeque<RawUpdate>>,
}

impl IntakeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues an update. Empty payloads are refused with a warning.
    ///
    /// Returns `true` if the update was queued.
    pub fn push(&self, update: RawUpdate) -> bool {
        if update.is_empty() {
            warn!("Refusing empty update payload");
            return false;
        }
        self.items.lock().push_back(update);
        true
    }

    /// Takes the oldest update.
    pub fn pop(&self) -> Option<RawUpdate> {
        self.items.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}
