//! Interceptor chains.
//!
//! Interceptors are onion-style middleware around two scopes:
//!
//! - [`ProcessingInterceptor`] wraps the whole listener walk for one event
//!   and runs once per dispatch.
//! - [`ListenerInterceptor`] wraps exactly one listener invocation and runs
//!   only after that listener's filter has passed.
//!
//! Each chain is ordered by ascending priority, and the first interceptor
//! is the outermost. An interceptor receives a `next` continuation; calling
//! `next.proceed(ctx)` runs the rest of the chain and the terminal action.
//! Not calling it short-circuits, and the interceptor's own return value is
//! used instead.
//!
//! ```text
//! processing[0] ─▶ processing[1] ─▶ walk listeners
//!                                      │
//!                                      ├─ L1: listener[0] ─▶ listener[1] ─▶ bind + handler
//!                                      └─ L2: listener[0] ─▶ bind + handler
//! ```
//!
//! Errors: a listener interceptor returning `Err` produces an
//! [`EventResult::Error`] for that listener only. A processing interceptor
//! returning `Err` aborts the whole dispatch with a [`DispatchError`].
//!
//! # Example
//!
//! ```rust,ignore
//! let audit = listener_interceptor_fn(|ctx, next| async move {
//!     if ctx.event().author_id() == Some("banned-user") {
//!         return Ok(EventResult::Invalid);
//!     }
//!     Ok(next.proceed(ctx).await)
//! });
//! manager.add_listener_interceptor(audit, Priority::HIGH);
//! ```

mod layer;

pub use layer::{NextService, TowerInterceptor};

use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use warden_core::{DispatchError, DispatchResult, EventResult, ListenerError};

use crate::context::{DispatchContext, ListenerContext};
use crate::error::BoxError;
use crate::listener::Listener;
use crate::results::EventResults;

// =============================================================================
// Listener scope
// =============================================================================

/// Middleware around a single listener invocation.
#[async_trait]
pub trait ListenerInterceptor: Send + Sync {
    async fn intercept(
        &self,
        ctx: Arc<ListenerContext>,
        next: ListenerNext,
    ) -> Result<EventResult, BoxError>;
}

pub(crate) type ListenerChain = Arc<[Arc<dyn ListenerInterceptor>]>;

/// The continuation handed to a [`ListenerInterceptor`].
pub struct ListenerNext {
    chain: ListenerChain,
    index: usize,
}

impl ListenerNext {
    pub(crate) fn start(chain: ListenerChain) -> Self {
        Self { chain, index: 0 }
    }

    /// Runs the remaining interceptors, then binding and the handler.
    pub fn proceed(self, ctx: Arc<ListenerContext>) -> BoxFuture<'static, EventResult> {
        let Some(interceptor) = self.chain.get(self.index).cloned() else {
            return Listener::invoke(ctx);
        };
        let next = Self {
            chain: self.chain,
            index: self.index + 1,
        };
        async move {
            interceptor
                .intercept(ctx, next)
                .await
                .unwrap_or_else(|err| EventResult::Error(ListenerError::Interceptor(err)))
        }
        .boxed()
    }
}

/// A [`ListenerInterceptor`] backed by an async closure.
pub struct ListenerInterceptorFn<F>(F);

/// Wraps a closure as a [`ListenerInterceptor`].
pub fn listener_interceptor_fn<F, Fut>(f: F) -> ListenerInterceptorFn<F>
where
    F: Fn(Arc<ListenerContext>, ListenerNext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<EventResult, BoxError>> + Send + 'static,
{
    ListenerInterceptorFn(f)
}

#[async_trait]
impl<F, Fut> ListenerInterceptor for ListenerInterceptorFn<F>
where
    F: Fn(Arc<ListenerContext>, ListenerNext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<EventResult, BoxError>> + Send + 'static,
{
    async fn intercept(
        &self,
        ctx: Arc<ListenerContext>,
        next: ListenerNext,
    ) -> Result<EventResult, BoxError> {
        (self.0)(ctx, next).await
    }
}

// =============================================================================
// Processing scope
// =============================================================================

/// Middleware around the whole listener walk for one event.
#[async_trait]
pub trait ProcessingInterceptor: Send + Sync {
    async fn intercept(
        &self,
        ctx: Arc<DispatchContext>,
        next: ProcessingNext,
    ) -> Result<EventResults, BoxError>;
}

pub(crate) type ProcessingChain = Arc<[Arc<dyn ProcessingInterceptor>]>;

type Walk = Box<dyn FnOnce(Arc<DispatchContext>) -> EventResults + Send>;

/// The continuation handed to a [`ProcessingInterceptor`].
///
/// The terminal action starts the listener walk and returns its lazy result
/// stream; no listener runs until that stream is polled.
pub struct ProcessingNext {
    chain: ProcessingChain,
    index: usize,
    walk: Walk,
}

impl ProcessingNext {
    pub(crate) fn start<W>(chain: ProcessingChain, walk: W) -> Self
    where
        W: FnOnce(Arc<DispatchContext>) -> EventResults + Send + 'static,
    {
        Self {
            chain,
            index: 0,
            walk: Box::new(walk),
        }
    }

    /// Runs the remaining interceptors, then starts the listener walk.
    pub fn proceed(
        self,
        ctx: Arc<DispatchContext>,
    ) -> BoxFuture<'static, DispatchResult<EventResults>> {
        let Some(interceptor) = self.chain.get(self.index).cloned() else {
            let walk = self.walk;
            return futures::future::ready(Ok(walk(ctx))).boxed();
        };
        let next = Self {
            chain: self.chain,
            index: self.index + 1,
            walk: self.walk,
        };
        async move {
            interceptor.intercept(ctx, next).await.map_err(|err| {
                // An inner interceptor's failure passes through unchanged.
                match err.downcast::<DispatchError>() {
                    Ok(inner) => *inner,
                    Err(err) => DispatchError::Interceptor(err),
                }
            })
        }
        .boxed()
    }
}

/// A [`ProcessingInterceptor`] backed by an async closure.
pub struct ProcessingInterceptorFn<F>(F);

/// Wraps a closure as a [`ProcessingInterceptor`].
pub fn processing_interceptor_fn<F, Fut>(f: F) -> ProcessingInterceptorFn<F>
where
    F: Fn(Arc<DispatchContext>, ProcessingNext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<EventResults, BoxError>> + Send + 'static,
{
    ProcessingInterceptorFn(f)
}

#[async_trait]
impl<F, Fut> ProcessingInterceptor for ProcessingInterceptorFn<F>
where
    F: Fn(Arc<DispatchContext>, ProcessingNext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<EventResults, BoxError>> + Send + 'static,
{
    async fn intercept(
        &self,
        ctx: Arc<DispatchContext>,
        next: ProcessingNext,
    ) -> Result<EventResults, BoxError> {
        (self.0)(ctx, next).await
    }
}

// =============================================================================
// Ordering
// =============================================================================

/// A priority-ordered list of interceptors. Ties keep insertion order.
pub(crate) struct Ordered<T: ?Sized> {
    entries: Vec<(i32, Arc<T>)>,
}

impl<T: ?Sized> Default for Ordered<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: ?Sized> Clone for Ordered<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T: ?Sized> Ordered<T> {
    pub(crate) fn insert(&mut self, priority: i32, item: Arc<T>) {
        let pos = self.entries.partition_point(|(p, _)| *p <= priority);
        self.entries.insert(pos, (priority, item));
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Merges two ordered lists; on equal priority entries of `self` come
    /// first.
    pub(crate) fn merged(&self, other: &Self) -> Arc<[Arc<T>]> {
        let mut out = Vec::with_capacity(self.entries.len() + other.entries.len());
        let (mut a, mut b) = (self.entries.iter().peekable(), other.entries.iter().peekable());
        loop {
            let take_a = match (a.peek(), b.peek()) {
                (Some((pa, _)), Some((pb, _))) => pa <= pb,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            let next = if take_a { a.next() } else { b.next() };
            if let Some((_, item)) = next {
                out.push(Arc::clone(item));
            }
        }
        out.into()
    }

    pub(crate) fn to_chain(&self) -> Arc<[Arc<T>]> {
        self.merged(&Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_is_stable() {
        let mut list: Ordered<str> = Ordered::default();
        list.insert(5, Arc::from("b"));
        list.insert(1, Arc::from("a"));
        list.insert(5, Arc::from("c"));
        let chain = list.to_chain();
        let names: Vec<&str> = chain.iter().map(|s| &**s).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_merge_prefers_first_on_ties() {
        let mut global: Ordered<str> = Ordered::default();
        global.insert(0, Arc::from("g0"));
        global.insert(10, Arc::from("g10"));
        let mut local: Ordered<str> = Ordered::default();
        local.insert(0, Arc::from("l0"));
        local.insert(5, Arc::from("l5"));

        let chain = global.merged(&local);
        let names: Vec<&str> = chain.iter().map(|s| &**s).collect();
        assert_eq!(names, ["g0", "l0", "l5", "g10"]);
    }
}
