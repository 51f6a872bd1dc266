//! Handler actions.
//!
//! An action is either a plain function or one returning a future. Both are
//! stored type-erased so a registry can mix them; the dispatcher picks how to
//! drive each one based on the path it is running on.

use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use wabot_core::Update;

use crate::context::UserContext;
use crate::error::{HandlerError, HandlerResult};

/// Values an action may return.
///
/// `()` always succeeds; `Result<(), E>` fails with `E` converted into a
/// [`HandlerError`].
pub trait ActionOutput: Send + 'static {
    /// Converts the return value into a handler result.
    fn into_result(self) -> HandlerResult;
}

impl ActionOutput for () {
    fn into_result(self) -> HandlerResult {
        Ok(())
    }
}

impl<E> ActionOutput for Result<(), E>
where
    E: Into<HandlerError> + Send + 'static,
{
    fn into_result(self) -> HandlerResult {
        self.map_err(Into::into)
    }
}

type SyncFn = dyn Fn(Update, Option<UserContext>) -> HandlerResult + Send + Sync;
type AsyncFn =
    dyn Fn(Update, Option<UserContext>) -> BoxFuture<'static, HandlerResult> + Send + Sync;

/// A type-erased handler callback.
///
/// The second argument is `Some` only when the handler was registered with
/// context enabled.
#[derive(Clone)]
pub enum Action {
    /// Runs to completion inline.
    Sync(Arc<SyncFn>),
    /// Returns a future the dispatcher awaits.
    Async(Arc<AsyncFn>),
}

impl Action {
    /// Wraps a synchronous function.
    pub fn from_fn<F, R>(f: F) -> Self
    where
        F: Fn(Update, Option<UserContext>) -> R + Send + Sync + 'static,
        R: ActionOutput,
    {
        Self::Sync(Arc::new(move |update, ctx| f(update, ctx).into_result()))
    }

    /// Wraps an async function.
    pub fn from_async<F, Fut, R>(f: F) -> Self
    where
        F: Fn(Update, Option<UserContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: ActionOutput,
    {
        Self::Async(Arc::new(move |update, ctx| {
            f(update, ctx).map(ActionOutput::into_result).boxed()
        }))
    }

    /// An action that does nothing and succeeds.
    pub fn identity() -> Self {
        Self::from_fn(|_, _| ())
    }

    /// Returns `true` for async actions.
    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }

    /// Runs the action on an async path. Panics become
    /// [`HandlerError::Panicked`].
    pub async fn run(&self, update: Update, ctx: Option<UserContext>) -> HandlerResult {
        match self {
            Self::Sync(f) => {
                catch_unwind(AssertUnwindSafe(|| f(update, ctx))).unwrap_or_else(|payload| {
                    Err(HandlerError::from_panic(payload))
                })
            }
            Self::Async(f) => {
                let fut = match catch_unwind(AssertUnwindSafe(|| f(update, ctx))) {
                    Ok(fut) => fut,
                    Err(payload) => return Err(HandlerError::from_panic(payload)),
                };
                AssertUnwindSafe(fut)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| Err(HandlerError::from_panic(payload)))
            }
        }
    }

    /// Runs the action on the blocking path, driving async actions to
    /// completion on the current thread.
    ///
    /// Must not be called from inside an async runtime worker when the
    /// action awaits runtime-bound resources.
    pub fn run_blocking(&self, update: Update, ctx: Option<UserContext>) -> HandlerResult {
        futures::executor::block_on(self.run(update, ctx))
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("Action::Sync(..)"),
            Self::Async(_) => f.write_str("Action::Async(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wabot_core::{DisabledMessenger, Extracted, Inbound, MessageKind};

    fn update() -> Update {
        let inbound = Inbound {
            sender_id: "1".into(),
            sender_display_name: String::new(),
            message_id: None,
            message_kind: MessageKind::Text,
            timestamp: None,
            message: Arc::new(json!({})),
            value: Arc::new(json!({})),
        };
        Update::new(&inbound, Extracted::default(), Arc::new(DisabledMessenger))
    }

    #[test]
    fn test_sync_results() {
        assert!(Action::identity().run_blocking(update(), None).is_ok());

        let failing = Action::from_fn(|_, _| -> Result<(), HandlerError> { Err("nope".into()) });
        assert!(matches!(
            failing.run_blocking(update(), None),
            Err(HandlerError::Message(m)) if m == "nope"
        ));
    }

    #[test]
    fn test_sync_panic_is_caught() {
        let action = Action::from_fn(|_, _| -> () { panic!("boom") });
        assert!(matches!(
            action.run_blocking(update(), None),
            Err(HandlerError::Panicked(m)) if m == "boom"
        ));
    }

    fn explode() -> HandlerResult {
        panic!("async boom")
    }

    #[tokio::test]
    async fn test_async_panic_is_caught() {
        let action = Action::from_async(|_, _| async { explode() });
        assert!(action.is_async());
        assert!(matches!(
            action.run(update(), None).await,
            Err(HandlerError::Panicked(m)) if m == "async boom"
        ));
    }

    #[test]
    fn test_async_action_on_blocking_path() {
        let action = Action::from_async(|update: Update, _| async move {
            if update.sender_id == "1" {
                Ok(())
            } else {
                Err(HandlerError::msg("wrong sender"))
            }
        });
        assert!(action.run_blocking(update(), None).is_ok());
    }
}
