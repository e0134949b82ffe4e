//! # Warden Core
//!
//! Foundation types for the Warden event dispatch framework.
//!
//! This crate holds the types that every other layer agrees on:
//!
//! - **Event System**: Type-erased events with identity accessors and runtime
//!   downcasting ([`Event`], [`BoxedEvent`], [`EventType`])
//! - **Message Segments**: Platform-agnostic content used for plain-text and
//!   mention extraction ([`RichTextSegment`])
//! - **Results**: The closed set of per-listener outcomes ([`EventResult`],
//!   [`ListenerResult`])
//! - **Errors**: Listener and dispatch failures ([`ListenerError`],
//!   [`DispatchError`], [`BindError`])
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────────┐     ┌──────────────────┐
//! │   Adapter   │────▶│ EventListenerManager │────▶│ ListenerResult 1 │
//! │ (BoxedEvent)│     │ (warden-framework)   │────▶│ ListenerResult 2 │
//! └─────────────┘     └──────────────────────┘────▶│ ...              │
//!                                                  └──────────────────┘
//! ```

pub mod foundation;

pub use foundation::{
    BindError, BindResult, BoxError, BoxedEvent, DispatchError, DispatchResult, Event,
    EventResult, EventType, ListenerError, ListenerResult, ResultKind, ResultValue,
    RichTextSegment,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::*;
}
