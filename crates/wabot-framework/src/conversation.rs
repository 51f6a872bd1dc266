//! Conversation state: single-use "next step" overrides per sender.
//!
//! ```text
//! NoOverride ──set──▶ Overridden ──(fallback or next executes)──▶ NoOverride
//!                      │    ▲
//!                      └set─┘  (replaces, old pair discarded)
//! ```

use std::collections::HashMap;

use parking_lot::Mutex;

use wabot_core::Update;

use crate::context::UserContext;
use crate::error::RegistrationResult;
use crate::handler::{Action, ActionOutput, Filter, Handler, HandlerKind};

/// Default pattern that cancels a pending next step.
pub const DEFAULT_END_KEYWORD: &str = "(?i)^(end|stop|cancel)$";

/// The pair of handlers installed for one sender.
///
/// The fallback is tried before the next handler, so a cancel keyword
/// always wins over the step in flight.
#[derive(Debug, Clone)]
pub struct ConversationOverride {
    pub fallback: Handler,
    pub next: Handler,
}

impl ConversationOverride {
    /// Whether `handler` is one of the pair.
    pub fn contains(&self, handler: &Handler) -> bool {
        self.fallback.same(handler) || self.next.same(handler)
    }
}

/// In-memory map from sender id to its pending override.
///
/// At most one override exists per sender. A single lock guards the map so
/// the read and clear halves of one dispatch each see a consistent state.
#[derive(Debug, Default)]
pub struct ConversationStore {
    overrides: Mutex<HashMap<String, ConversationOverride>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs an override, replacing any existing one unexecuted.
    pub fn set_override(&self, sender_id: &str, next: Handler, fallback: Handler) {
        self.overrides
            .lock()
            .insert(sender_id.to_string(), ConversationOverride { fallback, next });
    }

    pub fn get_override(&self, sender_id: &str) -> Option<ConversationOverride> {
        self.overrides.lock().get(sender_id).cloned()
    }

    /// Removes the sender's override if `executed` is one of its handlers.
    ///
    /// Returns `true` if an override was removed.
    pub fn clear_if_matches(&self, sender_id: &str, executed: &Handler) -> bool {
        let mut overrides = self.overrides.lock();
        match overrides.get(sender_id) {
            Some(pair) if pair.contains(executed) => {
                overrides.remove(sender_id);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.overrides.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.lock().is_empty()
    }
}

/// Describes the next step of a conversation.
///
/// ```rust,ignore
/// dispatcher.set_next_handler(
///     &update.sender_id,
///     NextStep::new("text", Action::from_fn(ask_age)).end_action(Action::from_fn(goodbye)),
/// )?;
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct NextStep {
    kind: String,
    action: Action,
    filter: Option<FilterSpec>,
    end_keyword: Option<String>,
    end_action: Option<Action>,
    wants_context: bool,
}

#[derive(Debug, Clone)]
enum FilterSpec {
    Pattern(String),
    Ready(Filter),
}

impl NextStep {
    /// A next step of kind `kind` (a kind name such as `"text"`).
    pub fn new(kind: impl Into<String>, action: Action) -> Self {
        Self {
            kind: kind.into(),
            action,
            filter: None,
            end_keyword: None,
            end_action: None,
            wants_context: true,
        }
    }

    /// A next step running a synchronous function.
    pub fn from_fn<F, R>(kind: impl Into<String>, f: F) -> Self
    where
        F: Fn(Update, Option<UserContext>) -> R + Send + Sync + 'static,
        R: ActionOutput,
    {
        Self::new(kind, Action::from_fn(f))
    }

    /// A next step running an async function.
    pub fn from_async<F, Fut, R>(kind: impl Into<String>, f: F) -> Self
    where
        F: Fn(Update, Option<UserContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: ActionOutput,
    {
        Self::new(kind, Action::from_async(f))
    }

    /// Filters the next handler on a pattern.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.filter = Some(FilterSpec::Pattern(pattern.into()));
        self
    }

    /// Filters the next handler on a predicate.
    pub fn predicate<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(FilterSpec::Ready(Filter::predicate(f)));
        self
    }

    /// Overrides the cancel pattern.
    pub fn end_keyword(mut self, pattern: impl Into<String>) -> Self {
        self.end_keyword = Some(pattern.into());
        self
    }

    /// Action run when the sender cancels. Defaults to doing nothing.
    pub fn end_action(mut self, action: Action) -> Self {
        self.end_action = Some(action);
        self
    }

    /// Whether the next handler's action receives a context.
    pub fn context(mut self, wants_context: bool) -> Self {
        self.wants_context = wants_context;
        self
    }

    /// Builds the `(next, fallback)` pair.
    ///
    /// `default_end_keyword` is used when no end keyword was set.
    pub fn into_handlers(self, default_end_keyword: &str) -> RegistrationResult<(Handler, Handler)> {
        let kind: HandlerKind = self.kind.parse()?;
        let filter = match self.filter {
            None => Filter::Any,
            Some(FilterSpec::Pattern(p)) => Filter::pattern(&p)?,
            Some(FilterSpec::Ready(f)) => f,
        };
        let next = Handler::from_parts(
            kind,
            filter,
            self.action,
            self.wants_context,
            false,
            Some(format!("next:{kind}")),
        );

        let end_keyword = self.end_keyword.as_deref().unwrap_or(default_end_keyword);
        let fallback = Handler::from_parts(
            HandlerKind::Message,
            Filter::pattern(end_keyword)?,
            self.end_action.unwrap_or_else(Action::identity),
            true,
            false,
            Some("fallback".to_string()),
        );

        Ok((next, fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistrationError;

    fn handler() -> Handler {
        Handler::new(HandlerKind::Message, Filter::Any, Action::identity())
    }

    #[test]
    fn test_set_replaces_existing_override() {
        let store = ConversationStore::new();
        let (first, second) = (handler(), handler());

        store.set_override("1", first.clone(), handler());
        store.set_override("1", second.clone(), handler());

        let pair = store.get_override("1").unwrap();
        assert!(pair.next.same(&second));
        assert!(!pair.contains(&first));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_clear_only_for_members_of_the_pair() {
        let store = ConversationStore::new();
        let (next, fallback, other) = (handler(), handler(), handler());
        store.set_override("1", next.clone(), fallback.clone());

        assert!(!store.clear_if_matches("1", &other));
        assert!(store.get_override("1").is_some());

        assert!(store.clear_if_matches("1", &fallback));
        assert!(store.get_override("1").is_none());

        // Idempotent.
        assert!(!store.clear_if_matches("1", &fallback));
        assert!(store.is_empty());
    }

    #[test]
    fn test_next_step_builds_pair() {
        let (next, fallback) = NextStep::new("interactive", Action::identity())
            .pattern("opt_")
            .into_handlers(DEFAULT_END_KEYWORD)
            .unwrap();

        assert_eq!(next.kind(), HandlerKind::INTERACTIVE);
        assert!(next.filter().check("opt_1"));
        assert_eq!(fallback.kind(), HandlerKind::Message);
        assert!(fallback.filter().check("Cancel"));
        assert!(!fallback.filter().check("continue"));
    }

    #[test]
    fn test_next_step_custom_end_keyword() {
        let (_, fallback) = NextStep::new("text", Action::identity())
            .end_keyword("(?i)^quit$")
            .into_handlers(DEFAULT_END_KEYWORD)
            .unwrap();

        assert!(fallback.filter().check("QUIT"));
        assert!(!fallback.filter().check("stop"));
    }

    #[test]
    fn test_next_step_unknown_kind() {
        let err = NextStep::new("document", Action::identity())
            .into_handlers(DEFAULT_END_KEYWORD)
            .unwrap_err();
        assert!(matches!(err, RegistrationError::UnknownKind(k) if k == "document"));
    }
}
