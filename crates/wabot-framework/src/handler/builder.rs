//! Builders for handlers.
//!
//! ```rust,ignore
//! let greet = on_message()
//!     .pattern("(?i)hello")
//!     .context(false)
//!     .action(|update, _| println!("hello from {}", update.sender_id))?;
//!
//! let pick = on_interactive(true, false)
//!     .persistent(true)
//!     .async_action(|update, _| async move { update.reply_text("picked").await.map(|_| ()) })?;
//! ```

use std::future::Future;

use wabot_core::Update;

use super::{Action, ActionOutput, Filter, Handler, HandlerKind};
use crate::context::UserContext;
use crate::error::RegistrationResult;

/// Builds a [`Handler`].
///
/// Filter errors are held until the action is attached, so a whole
/// registration chain needs a single `?`.
#[derive(Debug)]
#[must_use = "a builder does nothing until an action is attached"]
pub struct HandlerBuilder {
    kind: HandlerKind,
    filter: RegistrationResult<Filter>,
    wants_context: bool,
    persistent: bool,
    name: Option<String>,
}

impl HandlerBuilder {
    /// Starts a builder for `kind`: no filter, context on, not persistent.
    pub fn new(kind: HandlerKind) -> Self {
        Self {
            kind,
            filter: Ok(Filter::Any),
            wants_context: true,
            persistent: false,
            name: None,
        }
    }

    /// Filters on a pattern matched at the start of the derived text.
    pub fn pattern(mut self, pattern: &str) -> Self {
        self.filter = Filter::pattern(pattern);
        self
    }

    /// Filters on a custom predicate.
    pub fn predicate<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.filter = Ok(Filter::predicate(f));
        self
    }

    /// Sets a prebuilt filter.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Ok(filter);
        self
    }

    /// Whether the action receives a [`UserContext`].
    pub fn context(mut self, wants_context: bool) -> Self {
        self.wants_context = wants_context;
        self
    }

    /// Whether the handler is tried while a conversation override is active.
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Names the handler for logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Finishes with a synchronous action.
    pub fn action<F, R>(self, f: F) -> RegistrationResult<Handler>
    where
        F: Fn(Update, Option<UserContext>) -> R + Send + Sync + 'static,
        R: ActionOutput,
    {
        self.build(Action::from_fn(f))
    }

    /// Finishes with an async action.
    pub fn async_action<F, Fut, R>(self, f: F) -> RegistrationResult<Handler>
    where
        F: Fn(Update, Option<UserContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: ActionOutput,
    {
        self.build(Action::from_async(f))
    }

    /// Finishes with a prebuilt action.
    pub fn build(self, action: Action) -> RegistrationResult<Handler> {
        let filter = self.filter?;
        Ok(Handler::from_parts(
            self.kind,
            filter,
            action,
            self.wants_context,
            self.persistent,
            self.name,
        ))
    }
}

/// Text messages.
pub fn on_message() -> HandlerBuilder {
    HandlerBuilder::new(HandlerKind::Message)
}

/// Interactive replies; each flag enables one reply subtype.
pub fn on_interactive(handle_button: bool, handle_list: bool) -> HandlerBuilder {
    HandlerBuilder::new(HandlerKind::InteractiveQuery {
        handle_button,
        handle_list,
    })
}

pub fn on_image() -> HandlerBuilder {
    HandlerBuilder::new(HandlerKind::Image)
}

pub fn on_audio() -> HandlerBuilder {
    HandlerBuilder::new(HandlerKind::Audio)
}

pub fn on_video() -> HandlerBuilder {
    HandlerBuilder::new(HandlerKind::Video)
}

pub fn on_sticker() -> HandlerBuilder {
    HandlerBuilder::new(HandlerKind::Sticker)
}

pub fn on_location() -> HandlerBuilder {
    HandlerBuilder::new(HandlerKind::Location)
}

pub fn on_unknown() -> HandlerBuilder {
    HandlerBuilder::new(HandlerKind::Unknown)
}

pub fn on_unsupported() -> HandlerBuilder {
    HandlerBuilder::new(HandlerKind::Unsupported)
}
