//! Services that sit between the configuration store and the outside world.
//!
//! - [`GenerationOrchestrator`]: decides when to render and which completion
//!   may replace the preview
//! - [`TemplateCoordinator`]: cached, symbology-filtered template list with
//!   save, delete and load flows
//! - [`ImportCoordinator`]: validates rows coming back from a bulk import
//! - [`Notifier`]: transient user-facing notices
//!
//! Collaborators are trait seams ([`Renderer`], [`TemplateStore`],
//! [`ImportPipeline`], [`LayoutSource`]) so they can be swapped for fakes.
//! Every remote answer uses the [`Envelope`](crate::models::Envelope) shape.

pub mod generation;
pub mod import;
pub mod layout;
pub mod notify;
pub mod persistence;
pub mod renderer;
pub mod templates;

pub use generation::{
    GenerationOrchestrator, GenerationOutcome, GenerationPhase, GenerationTicket,
    ManualTriggerRejected, TriggerOrigin,
};
pub use import::{ImportCoordinator, ImportPipeline, RowReport};
pub use layout::{LayoutSource, StaticLayout};
pub use notify::{Notice, NoticeLevel, Notifier};
pub use persistence::{JsonFileTemplateStore, PersistenceError, TemplateStore};
pub use renderer::{
    CommandRenderer, GenerationError, PNG_SIGNATURE, Renderer, UnconfiguredRenderer, is_png,
};
pub use templates::{
    AlwaysConfirm, Confirm, DeleteOutcome, TemplateChange, TemplateCoordinator, TemplateError,
};
