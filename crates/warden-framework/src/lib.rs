//! # Warden Framework
//!
//! The filter, interceptor and dispatch pipeline of the Warden event
//! framework.
//!
//! This layer provides:
//! - Keyword patterns with named captures and six text match strategies
//! - Filters: target pre-filters, keyword filters, AND/OR nesting and
//!   ALL/ANY/ANY_NO/NONE groups
//! - Processing-scope and listener-scope interceptor chains, with a tower
//!   adapter for listener scope
//! - A parameter binder from keyword captures to handler arguments
//! - Axum-style handlers with [`FromContext`] extractors
//! - [`EventListenerManager`], which dispatches an event to its listeners in
//!   priority order and yields the results lazily
//!
//! # Example
//!
//! ```rust,ignore
//! use warden_framework::*;
//!
//! let mut manager = EventListenerManager::new();
//! manager.register_listener(
//!     Listener::builder("ban")
//!         .filter(
//!             Filter::builder()
//!                 .value("ban {{target}}")
//!                 .match_type(MatchType::RegexFind)
//!                 .build()?,
//!         )
//!         .param(ParamDescriptor::string("target"))
//!         .handler(|args: BoundArgs| async move {
//!             format!("banned {}", args.get_str("target").unwrap_or_default())
//!         }),
//! );
//!
//! let results = manager.dispatch(event).await?.collect_all().await;
//! ```

pub mod binder;
pub mod context;
pub mod error;
pub mod extractor;
pub mod filter;
pub mod handler;
pub mod interceptor;
pub mod keyword;
pub mod listener;
pub mod manager;
pub mod matcher;
pub mod priority;
pub mod results;

pub use binder::{ArgValue, BoundArgs, Converter, ParamDefault, ParamDescriptor, bind};
pub use context::{DispatchContext, ListenerContext};
pub use error::{BoxError, ExtractError, ExtractResult, FilterError, KeywordError, KeywordResult};
pub use extractor::{EventOf, FromContext, State};
pub use filter::{
    ContentSelector, EventFilter, Filter, FilterBuilder, FilterFn, FilterGroup, FilterGroupSpec,
    FilterSpec, MultiMatchType, TargetFilter, filter_fn,
};
pub use handler::{BoxedHandler, Handler, IntoEventResult, into_handler};
pub use interceptor::{
    ListenerInterceptor, ListenerInterceptorFn, ListenerNext, NextService, ProcessingInterceptor,
    ProcessingInterceptorFn, ProcessingNext, TowerInterceptor, listener_interceptor_fn,
    processing_interceptor_fn,
};
pub use keyword::{Keyword, KeywordBuilder};
pub use listener::{Listener, ListenerBuilder, ListenerFilter};
pub use manager::EventListenerManager;
pub use matcher::MatchType;
pub use priority::Priority;
pub use results::EventResults;
