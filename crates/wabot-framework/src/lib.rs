//! # wabot framework
//!
//! Handler registration and the dispatch engine.
//!
//! This layer provides:
//! - Handler descriptors and their builders (`on_message`, `on_image`, ...)
//! - The append-only [`HandlerRegistry`]
//! - The [`ConversationStore`] holding single-use next-step overrides
//! - The [`IntakeQueue`] absorbing bursts of updates
//! - The [`Dispatcher`], with async and blocking paths and a
//!   `tower::Service` implementation
//!
//! The framework never spawns anything. Choosing between serial and fan-out
//! execution is up to the host (see `wabot-runtime`).

pub mod context;
pub mod conversation;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod queue;
pub mod registry;

pub use context::UserContext;
pub use conversation::{ConversationOverride, ConversationStore, DEFAULT_END_KEYWORD, NextStep};
pub use dispatcher::{Dispatcher, DispatcherBuilder, Outcome};
pub use error::{HandlerError, HandlerResult, RegistrationError, RegistrationResult};
pub use handler::{
    Action, ActionOutput, Filter, Handler, HandlerBuilder, HandlerKind, on_audio, on_image,
    on_interactive, on_location, on_message, on_sticker, on_unknown, on_unsupported, on_video,
};
pub use queue::IntakeQueue;
pub use registry::HandlerRegistry;
