//! Listener registrations.
//!
//! A [`Listener`] bundles a handler with its filter, declared parameters,
//! listener-scope interceptors and priority. It is built once and immutable
//! afterwards.
//!
//! # Example
//!
//! ```rust,ignore
//! let listener = Listener::builder("ban")
//!     .priority(Priority::HIGH)
//!     .filter(
//!         Filter::builder()
//!             .target(TargetFilter::new().group("g1"))
//!             .value("ban {{target}}")
//!             .match_type(MatchType::RegexFind)
//!             .build()?,
//!     )
//!     .param(ParamDescriptor::string("target"))
//!     .handler(|args: BoundArgs| async move {
//!         format!("banned {}", args.get_str("target").unwrap_or_default())
//!     });
//! ```

use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::trace;
use warden_core::EventResult;

use crate::binder::{ParamDescriptor, bind};
use crate::context::{DispatchContext, ListenerContext};
use crate::filter::{Filter, FilterGroup};
use crate::handler::{BoxedHandler, Handler, into_handler};
use crate::interceptor::{ListenerInterceptor, Ordered};
use crate::keyword::Keyword;
use crate::priority::Priority;

/// The filter attached to a listener.
#[derive(Debug, Clone, Default)]
pub enum ListenerFilter {
    /// No filter; every event passes.
    #[default]
    None,
    /// A single filter tree.
    Single(Filter),
    /// A list of filters combined by a group combinator.
    Group(FilterGroup),
}

impl ListenerFilter {
    pub async fn evaluate(&self, ctx: &DispatchContext) -> bool {
        match self {
            Self::None => true,
            Self::Single(filter) => filter.evaluate(ctx).await,
            Self::Group(group) => group.evaluate(ctx).await,
        }
    }

    fn collect_keywords(&self) -> Vec<Keyword> {
        let mut keywords = Vec::new();
        match self {
            Self::None => {}
            Self::Single(filter) => filter.collect_keywords(&mut keywords),
            Self::Group(group) => group.collect_keywords(&mut keywords),
        }
        keywords
    }
}

/// A registered handler with its filter, parameters and interceptors.
pub struct Listener {
    id: Arc<str>,
    priority: i32,
    filter: ListenerFilter,
    params: Vec<ParamDescriptor>,
    interceptors: Ordered<dyn ListenerInterceptor>,
    handler: BoxedHandler,
    /// Keywords owned by the filter, in declaration order.
    keywords: Vec<Keyword>,
}

impl Listener {
    /// Starts building a listener with the given id.
    pub fn builder(id: impl Into<Arc<str>>) -> ListenerBuilder {
        ListenerBuilder {
            id: id.into(),
            priority: Priority::NORMAL,
            filter: ListenerFilter::None,
            params: Vec::new(),
            interceptors: Ordered::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn id_arc(&self) -> &Arc<str> {
        &self.id
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn filter(&self) -> &ListenerFilter {
        &self.filter
    }

    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    pub fn keywords(&self) -> &[Keyword] {
        &self.keywords
    }

    pub(crate) fn interceptors(&self) -> &Ordered<dyn ListenerInterceptor> {
        &self.interceptors
    }

    /// The terminal action of a listener chain: binds parameters, then runs
    /// the handler.
    ///
    /// A binding failure is returned as an error result and the handler is
    /// not called.
    pub(crate) fn invoke(ctx: Arc<ListenerContext>) -> BoxFuture<'static, EventResult> {
        let listener = Arc::clone(ctx.listener());
        let text = ctx.event().plain_text();

        match bind(&listener.params, &listener.keywords, text.as_deref()) {
            Ok(args) => {
                ctx.set_args(args);
                (listener.handler)(ctx)
            }
            Err(err) => {
                trace!(error = %err, "Parameter binding failed");
                futures::future::ready(EventResult::Error(err.into())).boxed()
            }
        }
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("filter", &self.filter)
            .field("params", &self.params)
            .field("interceptors", &self.interceptors.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Listener`]. Finished by [`handler`](Self::handler).
pub struct ListenerBuilder {
    id: Arc<str>,
    priority: i32,
    filter: ListenerFilter,
    params: Vec<ParamDescriptor>,
    interceptors: Ordered<dyn ListenerInterceptor>,
}

impl ListenerBuilder {
    /// Sets the listener priority (default: [`Priority::NORMAL`]).
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Attaches a single filter tree, replacing any previous filter.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = ListenerFilter::Single(filter);
        self
    }

    /// Attaches a filter group, replacing any previous filter.
    pub fn filter_group(mut self, group: FilterGroup) -> Self {
        self.filter = ListenerFilter::Group(group);
        self
    }

    /// Declares a handler parameter bound from keyword captures.
    pub fn param(mut self, param: ParamDescriptor) -> Self {
        self.params.push(param);
        self
    }

    /// Adds a listener-scope interceptor for this listener only.
    pub fn interceptor(
        mut self,
        interceptor: impl ListenerInterceptor + 'static,
        priority: i32,
    ) -> Self {
        self.interceptors.insert(priority, Arc::new(interceptor));
        self
    }

    /// Sets the handler and finishes the listener.
    pub fn handler<F, T>(self, handler: F) -> Listener
    where
        F: Handler<T>,
        T: 'static,
    {
        self.boxed_handler(into_handler(handler))
    }

    /// Sets a pre-boxed handler and finishes the listener.
    pub fn boxed_handler(self, handler: BoxedHandler) -> Listener {
        let keywords = self.filter.collect_keywords();
        Listener {
            id: self.id,
            priority: self.priority,
            filter: self.filter,
            params: self.params,
            interceptors: self.interceptors,
            handler,
            keywords,
        }
    }
}
