//! # wabot core
//!
//! The data model shared by every wabot crate.
//!
//! This crate knows what a Cloud API webhook looks like and nothing about
//! handlers or dispatch:
//!
//! - **Payloads**: [`RawUpdate`] and the [`Normalizer`] that validates an
//!   update and pulls out its first message ([`Inbound`]).
//! - **Message kinds**: [`MessageKind`], the provider's `type` field.
//! - **Extraction**: per-kind field extraction ([`extract`], [`Extracted`]).
//! - **Update view**: [`Update`], what a handler receives.
//! - **Outbound**: the [`Messenger`] collaborator trait.
//!
//! ```text
//! RawUpdate ──▶ Normalizer ──▶ Inbound ──┐
//!                                        ├──▶ Update ──▶ handler
//!               handler kind ──▶ Extracted ┘
//! ```

pub mod error;
pub mod extract;
pub mod kind;
pub mod messenger;
pub mod payload;
pub mod update;

pub use error::{ApiError, ApiResult, ExtractError, ExtractResult, UpdateError};
pub use extract::Extracted;
pub use kind::MessageKind;
pub use messenger::{BoxedMessenger, DisabledMessenger, Messenger, TextOptions};
pub use payload::{Inbound, Normalizer, RawUpdate};
pub use update::Update;
