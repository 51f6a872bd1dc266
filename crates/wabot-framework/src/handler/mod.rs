//! Handler descriptors.
//!
//! A [`Handler`] is a `(kind, filter, action)` triple plus two flags:
//!
//! - `wants_context`: the action receives a fresh [`UserContext`].
//! - `persistent`: the handler is tried even while the sender has a
//!   conversation override installed.
//!
//! Handlers are immutable once built and cheap to clone. Clones share
//! identity: the conversation store compares handlers with
//! [`Handler::same`], never structurally.
//!
//! [`UserContext`]: crate::context::UserContext

mod action;
mod builder;
mod filter;
mod kind;

use std::fmt;
use std::sync::Arc;

pub use action::{Action, ActionOutput};
pub use builder::{
    HandlerBuilder, on_audio, on_image, on_interactive, on_location, on_message, on_sticker,
    on_unknown, on_unsupported, on_video,
};
pub use filter::{Filter, PredicateFn};
pub use kind::HandlerKind;

/// Internal data for a handler, shared between clones.
struct HandlerInner {
    kind: HandlerKind,
    filter: Filter,
    action: Action,
    wants_context: bool,
    persistent: bool,
    name: Option<String>,
}

/// A registered or registrable handler.
#[derive(Clone)]
pub struct Handler {
    inner: Arc<HandlerInner>,
}

impl Handler {
    /// Creates a handler from its parts.
    pub fn new(kind: HandlerKind, filter: Filter, action: Action) -> Self {
        Self::from_parts(kind, filter, action, true, false, None)
    }

    pub(crate) fn from_parts(
        kind: HandlerKind,
        filter: Filter,
        action: Action,
        wants_context: bool,
        persistent: bool,
        name: Option<String>,
    ) -> Self {
        Self {
            inner: Arc::new(HandlerInner {
                kind,
                filter,
                action,
                wants_context,
                persistent,
                name,
            }),
        }
    }

    pub fn kind(&self) -> HandlerKind {
        self.inner.kind
    }

    pub fn filter(&self) -> &Filter {
        &self.inner.filter
    }

    pub fn action(&self) -> &Action {
        &self.inner.action
    }

    pub fn wants_context(&self) -> bool {
        self.inner.wants_context
    }

    pub fn is_persistent(&self) -> bool {
        self.inner.persistent
    }

    /// The name given at build time, or the kind name.
    pub fn name(&self) -> &str {
        self.inner.name.as_deref().unwrap_or(self.inner.kind.name())
    }

    /// Identity comparison: `true` only for clones of the same handler.
    pub fn same(&self, other: &Handler) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name())
            .field("kind", &self.inner.kind)
            .field("filter", &self.inner.filter)
            .field("wants_context", &self.inner.wants_context)
            .field("persistent", &self.inner.persistent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_shared_by_clones_only() {
        let a = Handler::new(HandlerKind::Message, Filter::Any, Action::identity());
        let b = Handler::new(HandlerKind::Message, Filter::Any, Action::identity());

        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
        assert_eq!(a.name(), "text");
    }
}
