//! The bot host: intake queue plus execution strategy around a dispatcher.
//!
//! ```rust,ignore
//! use wabot_runtime::WhatsAppBot;
//! use wabot_framework::on_message;
//!
//! let bot = WhatsAppBot::builder()
//!     .messenger(my_messenger)
//!     .config_file("wabot.toml")
//!     .build()?;
//!
//! bot.register(on_message().action(|update, _| println!("{}", update.message_text))?);
//!
//! // From the webhook handler:
//! bot.submit_update(raw).await;
//! ```

use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, trace, warn};

use wabot_core::{BoxedMessenger, DisabledMessenger, RawUpdate};
use wabot_framework::{Dispatcher, Handler, IntakeQueue, NextStep, RegistrationResult};

use crate::config::{BotConfig, ConfigLoader, ExecutionMode, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

/// A WhatsApp bot bound to one phone number id.
///
/// Updates go through the intake queue, then are drained according to the
/// configured [`ExecutionMode`]:
///
/// - `Serial`: one worker dispatches updates in arrival order; each update
///   finishes before the next starts.
/// - `FanOut`: every update gets its own tokio task (async path) or OS
///   thread (blocking path). Handlers must tolerate concurrency.
pub struct WhatsAppBot {
    config: BotConfig,
    dispatcher: Dispatcher,
    queue: IntakeQueue,
    /// Held by whichever serial submitter is draining the queue.
    serial: tokio::sync::Mutex<()>,
    tasks: TaskTracker,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl WhatsAppBot {
    /// Creates a bot from configuration.
    ///
    /// The configuration is validated and logging is initialized from it
    /// (a subscriber that is already installed is kept).
    pub fn from_config(config: &BotConfig, messenger: BoxedMessenger) -> RuntimeResult<Self> {
        validate_config(config)?;
        logging::init_from_config(&config.logging);

        let dispatcher = Dispatcher::builder(config.phone_number_id.as_str())
            .messenger(messenger)
            .mark_as_read(config.mark_as_read)
            .end_keyword(config.conversation.end_keyword.as_str())
            .build()?;

        info!(
            phone_number_id = %config.phone_number_id,
            execution = %config.execution.mode,
            mark_as_read = config.mark_as_read,
            "WhatsApp bot created"
        );

        Ok(Self {
            config: config.clone(),
            dispatcher,
            queue: IntakeQueue::new(),
            serial: tokio::sync::Mutex::new(()),
            tasks: TaskTracker::new(),
            threads: Mutex::new(Vec::new()),
        })
    }

    /// Creates a builder that loads configuration from files and the
    /// environment.
    pub fn builder() -> BotBuilder {
        BotBuilder::new()
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.config.execution.mode
    }

    /// The underlying dispatcher. Clones share handlers and conversation
    /// state with this bot, so actions can capture one to install next
    /// steps.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Appends a handler; returns its registry index.
    pub fn register(&self, handler: Handler) -> usize {
        self.dispatcher.register(handler)
    }

    /// Appends several handlers in order.
    pub fn register_all(&self, handlers: impl IntoIterator<Item = Handler>) {
        for handler in handlers {
            self.dispatcher.register(handler);
        }
    }

    /// Installs a next step for `sender_id`, replacing any pending one.
    pub fn set_next_handler(&self, sender_id: &str, step: NextStep) -> RegistrationResult<()> {
        self.dispatcher.set_next_handler(sender_id, step)
    }

    /// Number of updates waiting in the intake queue.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Queues an update and drains the queue on the async path.
    ///
    /// In serial mode the caller becomes the drainer unless another call is
    /// already draining; that one then picks the update up in FIFO order and
    /// this call returns at once. Handlers may therefore submit to their own
    /// bot. In fan-out mode it returns once every queued update has been
    /// handed to a task; use [`wait_idle`](Self::wait_idle) to wait for
    /// those tasks. Must be called within a tokio runtime.
    pub async fn submit_update(&self, update: RawUpdate) {
        if !self.queue.push(update) {
            return;
        }

        match self.config.execution.mode {
            ExecutionMode::Serial => {
                // Re-checked after release: an update pushed while the last
                // drainer was finishing would otherwise stay queued.
                while !self.queue.is_empty() {
                    let Ok(_guard) = self.serial.try_lock() else {
                        trace!("Queue is being drained elsewhere");
                        return;
                    };
                    while let Some(raw) = self.queue.pop() {
                        self.dispatcher.dispatch(&raw).await;
                    }
                }
            }
            ExecutionMode::FanOut => {
                while let Some(raw) = self.queue.pop() {
                    let dispatcher = self.dispatcher.clone();
                    self.tasks.spawn(async move {
                        dispatcher.dispatch(&raw).await;
                    });
                }
            }
        }
    }

    /// Queues an update and drains the queue on the calling thread.
    ///
    /// Serial mode shares the drain rules of
    /// [`submit_update`](Self::submit_update). In fan-out mode each update is
    /// dispatched on a new OS thread; see [`join_workers`](Self::join_workers).
    /// Async actions are driven with a local executor, so do not call this
    /// from inside an async runtime.
    pub fn submit_update_blocking(&self, update: RawUpdate) {
        if !self.queue.push(update) {
            return;
        }

        match self.config.execution.mode {
            ExecutionMode::Serial => {
                while !self.queue.is_empty() {
                    let Ok(_guard) = self.serial.try_lock() else {
                        trace!("Queue is being drained elsewhere");
                        return;
                    };
                    while let Some(raw) = self.queue.pop() {
                        self.dispatcher.dispatch_blocking(&raw);
                    }
                }
            }
            ExecutionMode::FanOut => {
                while let Some(raw) = self.queue.pop() {
                    self.spawn_worker(raw);
                }
            }
        }
    }

    fn spawn_worker(&self, raw: RawUpdate) {
        let dispatcher = self.dispatcher.clone();
        // Kept so a failed spawn can still dispatch inline.
        let fallback = raw.clone();
        let spawned = std::thread::Builder::new()
            .name("wabot-worker".to_string())
            .spawn(move || {
                dispatcher.dispatch_blocking(&raw);
            });

        match spawned {
            Ok(handle) => {
                let mut threads = self.threads.lock();
                threads.retain(|h| !h.is_finished());
                threads.push(handle);
            }
            Err(e) => {
                warn!(error = %e, "Failed to spawn worker thread, dispatching inline");
                self.dispatcher.dispatch_blocking(&fallback);
            }
        }
    }

    /// Waits until every fan-out task spawned so far has finished.
    pub async fn wait_idle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
        debug!("All dispatch tasks finished");
    }

    /// Joins every fan-out worker thread spawned so far.
    pub fn join_workers(&self) {
        let handles: Vec<_> = std::mem::take(&mut *self.threads.lock());
        for handle in handles {
            if handle.join().is_err() {
                error!("Worker thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for WhatsAppBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppBot")
            .field("dispatcher", &self.dispatcher)
            .field("execution", &self.config.execution.mode)
            .field("pending", &self.queue.len())
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

// =============================================================================
// BotBuilder
// =============================================================================

/// Builds a [`WhatsAppBot`] from loaded configuration.
pub struct BotBuilder {
    config_loader: ConfigLoader,
    messenger: BoxedMessenger,
}

impl BotBuilder {
    /// Without a messenger, outbound calls fail with `NotConnected`.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            messenger: Arc::new(DisabledMessenger),
        }
    }

    pub fn messenger(mut self, messenger: BoxedMessenger) -> Self {
        self.messenger = messenger;
        self
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges configuration programmatically, below files and environment.
    pub fn merge(mut self, config: BotConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    pub fn build(self) -> RuntimeResult<WhatsAppBot> {
        let config = self.config_loader.load()?;
        WhatsAppBot::from_config(&config, self.messenger)
    }
}

impl Default for BotBuilder {
    fn default() -> Self {
        Self::new()
    }
}
