//! # Warden
//!
//! Keyword-driven event filtering and priority dispatch for chat bots.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐     ┌──────────────────────────┐     ┌───────────────────────────┐
//! │ WardenRuntime │────▶│ processing interceptors  │────▶│ listener walk (priority)  │
//! │  (submit)     │     │  (once per event)        │     │  filter ─▶ interceptors   │
//! └───────────────┘     └──────────────────────────┘     │  ─▶ binder ─▶ handler     │
//!                                                        └─────────────┬─────────────┘
//!                                                                      ▼
//!                                                           lazy EventResults stream
//! ```
//!
//! - **Filters**: target pre-filters, keyword matching with six strategies,
//!   AND/OR nesting and ALL/ANY/ANY_NO/NONE groups
//! - **Interceptors**: processing scope (around a whole dispatch) and
//!   listener scope (around one listener), both with explicit continuations
//! - **Binder**: maps `{{name}}` keyword captures onto handler parameters
//! - **Handlers**: Axum-style async functions with context extractors
//! - **Runtime**: configuration, logging, bounded concurrent intake, shutdown
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use warden::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = WardenRuntime::new();
//!
//!     runtime.register_listener(
//!         Listener::builder("ban")
//!             .filter(
//!                 Filter::builder()
//!                     .value("ban {{target}}")
//!                     .match_type(MatchType::RegexFind)
//!                     .build()?,
//!             )
//!             .param(ParamDescriptor::string("target"))
//!             .handler(|args: BoundArgs| async move {
//!                 format!("banned {}", args.get_str("target").unwrap_or_default())
//!             }),
//!     );
//!
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` (default): load `warden.toml`
//! - `yaml-config`: load `warden.yaml`
//! - `json-log`: JSON log output

pub use warden_core as core;
pub use warden_framework as framework;
pub use warden_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use warden::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use warden_runtime::{DispatchOutcome, DispatchSummary, WardenConfig, WardenRuntime};

    // Events and results
    pub use warden_core::{
        BoxError, BoxedEvent, Event, EventResult, EventType, ListenerError, ListenerResult,
        RichTextSegment,
    };

    // Filters
    pub use warden_framework::{
        Filter, FilterGroup, FilterSpec, Keyword, MatchType, MultiMatchType, TargetFilter,
        filter_fn,
    };

    // Listeners, binding and extractors
    pub use warden_framework::{
        BoundArgs, EventListenerManager, EventOf, EventResults, Listener, ListenerContext,
        ParamDescriptor, Priority, State,
    };

    // Interceptors
    pub use warden_framework::{
        ListenerInterceptor, ListenerNext, ProcessingInterceptor, ProcessingNext,
        TowerInterceptor, listener_interceptor_fn, processing_interceptor_fn,
    };
}
