//! The dispatch engine.
//!
//! One call to [`Dispatcher::dispatch`] (or its blocking twin) processes one
//! update:
//!
//! 1. Normalize. Malformed, foreign and message-less updates are dropped
//!    with a log line.
//! 2. Mark the message as read, if configured. Failure is only logged.
//! 3. Build the candidate list: persistent handlers, then either the
//!    sender's override pair (fallback first) or the full registry.
//! 4. Walk the candidates. A candidate is skipped when its kind does not
//!    accept the message, its extraction fails, or its filter rejects (or
//!    panics on) the text it derived.
//! 5. Execute the first candidate that passes. Its outcome, success or
//!    failure, ends the walk and clears the sender's override if the
//!    executed handler belongs to it.
//!
//! Nothing inside the walk is surfaced as an error; [`Outcome`] only
//! reports what happened.

use std::convert::Infallible;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::{FutureExt, executor};
use tower::Service;
use tracing::{Instrument, Span, debug, debug_span, error, trace, warn};

use wabot_core::{
    BoxedMessenger, DisabledMessenger, Inbound, Normalizer, RawUpdate, Update, UpdateError,
};

use crate::context::UserContext;
use crate::conversation::{ConversationStore, DEFAULT_END_KEYWORD, NextStep};
use crate::error::{HandlerResult, RegistrationResult, panic_message};
use crate::handler::{Filter, Handler};
use crate::registry::HandlerRegistry;

/// What happened to one dispatched update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Dropped before any handler was considered.
    Dropped(UpdateError),
    /// No candidate accepted the update.
    Unmatched,
    /// A handler executed.
    Handled {
        /// Name of the executed handler.
        handler: String,
        /// Whether its action returned an error or panicked.
        failed: bool,
    },
}

impl Outcome {
    /// Returns `true` if a handler executed, successfully or not.
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled { .. })
    }
}

struct DispatcherInner {
    registry: HandlerRegistry,
    conversations: ConversationStore,
    normalizer: Normalizer,
    messenger: BoxedMessenger,
    mark_as_read: bool,
    end_keyword: String,
}

/// The candidate chosen by a walk, ready to execute.
struct Selected {
    handler: Handler,
    update: Update,
    ctx: Option<UserContext>,
}

/// Routes updates to handlers.
///
/// Cheap to clone; clones share the registry and the conversation store, so
/// a dispatcher can be handed to any number of concurrent workers.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Dispatcher {
    /// A dispatcher for `phone_number_id` with default settings and no
    /// outbound messenger.
    pub fn new(phone_number_id: impl Into<Arc<str>>) -> Self {
        Self::builder(phone_number_id).build_unchecked()
    }

    /// Starts a builder.
    pub fn builder(phone_number_id: impl Into<Arc<str>>) -> DispatcherBuilder {
        DispatcherBuilder {
            phone_number_id: phone_number_id.into(),
            messenger: Arc::new(DisabledMessenger),
            mark_as_read: true,
            end_keyword: DEFAULT_END_KEYWORD.to_string(),
        }
    }

    /// Appends a handler; returns its registry index.
    pub fn register(&self, handler: Handler) -> usize {
        let index = self.inner.registry.register(handler);
        debug!(index, "Registered handler");
        index
    }

    /// Installs a next step for `sender_id`, replacing any pending one.
    pub fn set_next_handler(&self, sender_id: &str, step: NextStep) -> RegistrationResult<()> {
        let (next, fallback) = step.into_handlers(&self.inner.end_keyword)?;
        debug!(sender = %sender_id, handler = next.name(), "Installed next step");
        self.inner
            .conversations
            .set_override(sender_id, next, fallback);
        Ok(())
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.inner.registry
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.inner.conversations
    }

    pub fn messenger(&self) -> &BoxedMessenger {
        &self.inner.messenger
    }

    /// The identity updates must be addressed to.
    pub fn phone_number_id(&self) -> &str {
        self.inner.normalizer.phone_number_id()
    }

    /// Processes one update, awaiting async actions.
    pub async fn dispatch(&self, raw: &RawUpdate) -> Outcome {
        let inbound = match self.normalize(raw) {
            Ok(inbound) => inbound,
            Err(err) => return Outcome::Dropped(err),
        };
        let span = dispatch_span(&inbound);

        async {
            if self.inner.mark_as_read
                && let Some(id) = &inbound.message_id
                && let Err(e) = self.inner.messenger.mark_as_read(id).await
            {
                error!(error = %e, "Failed to mark message as read");
            }

            match self.select(&inbound) {
                Some(Selected {
                    handler,
                    update,
                    ctx,
                }) => {
                    let result = handler.action().run(update, ctx).await;
                    self.finish(&inbound.sender_id, &handler, result)
                }
                None => self.unmatched(),
            }
        }
        .instrument(span)
        .await
    }

    /// Processes one update on the calling thread.
    ///
    /// Async actions and the mark-as-read call are driven with
    /// [`futures::executor::block_on`]; do not call this from inside an
    /// async runtime.
    pub fn dispatch_blocking(&self, raw: &RawUpdate) -> Outcome {
        let inbound = match self.normalize(raw) {
            Ok(inbound) => inbound,
            Err(err) => return Outcome::Dropped(err),
        };
        let span = dispatch_span(&inbound);
        let _enter = span.enter();

        if self.inner.mark_as_read
            && let Some(id) = &inbound.message_id
            && let Err(e) = executor::block_on(self.inner.messenger.mark_as_read(id))
        {
            error!(error = %e, "Failed to mark message as read");
        }

        match self.select(&inbound) {
            Some(Selected {
                handler,
                update,
                ctx,
            }) => {
                let result = handler.action().run_blocking(update, ctx);
                self.finish(&inbound.sender_id, &handler, result)
            }
            None => self.unmatched(),
        }
    }

    fn normalize(&self, raw: &RawUpdate) -> Result<Inbound, UpdateError> {
        self.inner.normalizer.normalize(raw).inspect_err(|err| match err {
            UpdateError::Malformed { .. } => warn!(error = %err, "Dropping update"),
            UpdateError::ForeignRecipient { .. } | UpdateError::NoMessage => {
                debug!(reason = %err, "Dropping update")
            }
        })
    }

    /// Persistent handlers first, then the override pair or the registry.
    /// A handler already listed is not listed again.
    fn candidates(&self, sender_id: &str) -> Vec<Handler> {
        let mut candidates = self.inner.registry.persistent();
        let rest = match self.inner.conversations.get_override(sender_id) {
            Some(pair) => {
                trace!("Sender has a pending next step");
                vec![pair.fallback, pair.next]
            }
            None => self.inner.registry.snapshot(),
        };
        for handler in rest {
            if !candidates.iter().any(|c| c.same(&handler)) {
                candidates.push(handler);
            }
        }
        candidates
    }

    fn select(&self, inbound: &Inbound) -> Option<Selected> {
        for handler in self.candidates(&inbound.sender_id) {
            if !handler.kind().accepts(&inbound.message_kind) {
                trace!(handler = handler.name(), "Kind mismatch, skipping");
                continue;
            }

            let data = match handler.kind().extract(&inbound.message) {
                Ok(data) => data,
                Err(e) => {
                    error!(handler = handler.name(), error = %e, "Extraction failed, skipping");
                    continue;
                }
            };

            match check_filter(handler.filter(), &data.text) {
                Ok(true) => {}
                Ok(false) => {
                    trace!(handler = handler.name(), "Filter rejected, skipping");
                    continue;
                }
                Err(panic) => {
                    error!(handler = handler.name(), panic = %panic, "Filter panicked, skipping");
                    continue;
                }
            }

            let update = Update::new(inbound, data, Arc::clone(&self.inner.messenger));
            let ctx = handler
                .wants_context()
                .then(|| UserContext::for_update(&update));
            return Some(Selected {
                handler,
                update,
                ctx,
            });
        }
        None
    }

    fn finish(&self, sender_id: &str, handler: &Handler, result: HandlerResult) -> Outcome {
        let failed = match result {
            Ok(()) => {
                debug!(handler = handler.name(), "Handler executed");
                false
            }
            Err(e) => {
                error!(handler = handler.name(), error = %e, "Handler execution failed");
                true
            }
        };

        if self.inner.conversations.clear_if_matches(sender_id, handler) {
            debug!("Next step consumed");
        }

        Outcome::Handled {
            handler: handler.name().to_string(),
            failed,
        }
    }

    fn unmatched(&self) -> Outcome {
        debug!("No handler matched");
        Outcome::Unmatched
    }
}

fn dispatch_span(inbound: &Inbound) -> Span {
    debug_span!(
        "dispatch",
        sender = %inbound.sender_id,
        message_id = inbound.message_id.as_deref().unwrap_or(""),
        kind = %inbound.message_kind,
    )
}

fn check_filter(filter: &Filter, text: &str) -> Result<bool, String> {
    catch_unwind(AssertUnwindSafe(|| filter.check(text))).map_err(|p| panic_message(p.as_ref()))
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("phone_number_id", &self.phone_number_id())
            .field("handler_count", &self.inner.registry.len())
            .field("pending_next_steps", &self.inner.conversations.len())
            .field("mark_as_read", &self.inner.mark_as_read)
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Configures a [`Dispatcher`].
#[must_use]
pub struct DispatcherBuilder {
    phone_number_id: Arc<str>,
    messenger: BoxedMessenger,
    mark_as_read: bool,
    end_keyword: String,
}

impl DispatcherBuilder {
    /// The outbound messenger handed to handlers.
    pub fn messenger(mut self, messenger: BoxedMessenger) -> Self {
        self.messenger = messenger;
        self
    }

    /// Whether every accepted message is marked as read before dispatch.
    pub fn mark_as_read(mut self, enabled: bool) -> Self {
        self.mark_as_read = enabled;
        self
    }

    /// Default cancel pattern for next steps.
    pub fn end_keyword(mut self, pattern: impl Into<String>) -> Self {
        self.end_keyword = pattern.into();
        self
    }

    /// Builds the dispatcher, checking that the end keyword compiles.
    pub fn build(self) -> RegistrationResult<Dispatcher> {
        Filter::pattern(&self.end_keyword)?;
        Ok(self.build_unchecked())
    }

    fn build_unchecked(self) -> Dispatcher {
        Dispatcher {
            inner: Arc::new(DispatcherInner {
                registry: HandlerRegistry::new(),
                conversations: ConversationStore::new(),
                normalizer: Normalizer::new(self.phone_number_id),
                messenger: self.messenger,
                mark_as_read: self.mark_as_read,
                end_keyword: self.end_keyword,
            }),
        }
    }
}

// ============================================================================
// Tower Service Implementation
// ============================================================================

/// Lets hosts stack tower middleware (timeouts, concurrency limits, ...) in
/// front of the dispatcher.
impl Service<RawUpdate> for Dispatcher {
    type Response = Outcome;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Outcome, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, raw: RawUpdate) -> Self::Future {
        let dispatcher = self.clone();
        async move { Ok(dispatcher.dispatch(&raw).await) }.boxed()
    }
}
