//! Listener registration and event dispatch.
//!
//! [`EventListenerManager`] is the central owner of all registered listeners
//! and interceptors. It:
//!
//! - Keeps listeners sorted by ascending priority at registration time
//!   (ties keep registration order), so dispatch never sorts.
//! - Merges global listener interceptors with each listener's own
//!   interceptors into one chain per listener, also at registration time.
//! - On each incoming event, runs the processing-interceptor chain whose
//!   terminal action is the listener walk, and returns the walk as a lazy
//!   [`EventResults`] stream.
//!
//! Per listener, the walk evaluates the filter, then runs the listener's
//! interceptor chain around binding and the handler. A listener whose filter
//! fails is absent from the output. Any failure inside the invocation
//! (binding, interceptor, handler error or panic) becomes an
//! [`EventResult::Error`] at that listener's position and the walk moves on.
//!
//! Registration takes `&mut self`. Dispatch takes `&self` and snapshots the
//! listener list by cloning an `Arc`, so concurrent dispatches of
//! independent events need no locking.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut manager = EventListenerManager::new();
//! manager.register_listener(ban_listener);
//! manager.add_listener_interceptor(audit, Priority::HIGH);
//!
//! let results = manager.dispatch(event).await?;
//! if let Some((item, value)) = results.first_value().await {
//!     println!("{} answered first", item.listener_id());
//! }
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::stream;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, debug_span, trace};
use warden_core::{
    BoxedEvent, DispatchError, DispatchResult, EventResult, ListenerError, ListenerResult,
};

use crate::context::{DispatchContext, ListenerContext};
use crate::error::panic_message;
use crate::interceptor::{
    ListenerChain, ListenerInterceptor, ListenerNext, Ordered, ProcessingChain,
    ProcessingInterceptor, ProcessingNext,
};
use crate::listener::Listener;
use crate::results::EventResults;

/// A listener together with its merged interceptor chain.
#[derive(Clone)]
struct Registered {
    listener: Arc<Listener>,
    chain: ListenerChain,
}

/// Owns listeners and interceptors and dispatches events to them.
///
/// Cloning is cheap and yields an independent snapshot of the current
/// registrations.
#[derive(Clone)]
pub struct EventListenerManager {
    listeners: Arc<Vec<Registered>>,
    processing: Ordered<dyn ProcessingInterceptor>,
    processing_chain: ProcessingChain,
    global: Ordered<dyn ListenerInterceptor>,
}

impl Default for EventListenerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EventListenerManager {
    pub fn new() -> Self {
        let processing = Ordered::default();
        Self {
            listeners: Arc::new(Vec::new()),
            processing_chain: processing.to_chain(),
            processing,
            global: Ordered::default(),
        }
    }

    // ─── Registration ─────────────────────────────────────────────────────────

    /// Registers a listener.
    ///
    /// It is inserted after every listener with a smaller or equal priority.
    pub fn register_listener(&mut self, listener: Listener) {
        let listener = Arc::new(listener);
        let chain = self.global.merged(listener.interceptors());
        let listeners = Arc::make_mut(&mut self.listeners);
        let pos = listeners.partition_point(|r| r.listener.priority() <= listener.priority());

        debug!(
            listener = %listener.id(),
            priority = listener.priority(),
            position = pos,
            "Listener registered"
        );
        listeners.insert(pos, Registered { listener, chain });
    }

    /// Adds a processing-scope interceptor around every dispatch pass.
    pub fn add_processing_interceptor(
        &mut self,
        interceptor: impl ProcessingInterceptor + 'static,
        priority: i32,
    ) {
        self.processing.insert(priority, Arc::new(interceptor));
        self.processing_chain = self.processing.to_chain();
    }

    /// Adds a listener-scope interceptor applied to every listener.
    ///
    /// On equal priority, global interceptors run outside a listener's own.
    pub fn add_listener_interceptor(
        &mut self,
        interceptor: impl ListenerInterceptor + 'static,
        priority: i32,
    ) {
        self.global.insert(priority, Arc::new(interceptor));
        for registered in Arc::make_mut(&mut self.listeners) {
            registered.chain = self.global.merged(registered.listener.interceptors());
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Returns the registered listeners in dispatch order.
    pub fn listeners(&self) -> impl Iterator<Item = &Arc<Listener>> {
        self.listeners.iter().map(|r| &r.listener)
    }

    // ─── Dispatch ─────────────────────────────────────────────────────────────

    /// Dispatches an event with a fresh cancellation token.
    pub async fn dispatch(&self, event: BoxedEvent) -> DispatchResult<EventResults> {
        self.dispatch_with_cancel(event, CancellationToken::new()).await
    }

    /// Dispatches an event that stops when `cancel` is cancelled.
    ///
    /// Returns `Err(DispatchError::Cancelled)` if the token is already
    /// cancelled, or the error of a failing processing interceptor. On
    /// success no listener has run yet: they run as the returned stream is
    /// polled.
    pub async fn dispatch_with_cancel(
        &self,
        event: BoxedEvent,
        cancel: CancellationToken,
    ) -> DispatchResult<EventResults> {
        let span = debug_span!("dispatch", event_name = %event.event_name());

        async {
            if cancel.is_cancelled() {
                return Err(DispatchError::Cancelled);
            }

            let ctx = Arc::new(DispatchContext::with_cancellation(event, cancel));
            let listeners = Arc::clone(&self.listeners);
            debug!(listeners = listeners.len(), "Dispatching event");

            let walk_span = Span::current();
            let next = ProcessingNext::start(self.processing_chain.clone(), move |ctx| {
                walk(ctx, listeners, walk_span)
            });
            next.proceed(ctx).await
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for EventListenerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListenerManager")
            .field("listeners", &self.listeners.len())
            .field("processing_interceptors", &self.processing.len())
            .field("listener_interceptors", &self.global.len())
            .finish()
    }
}

// =============================================================================
// The listener walk
// =============================================================================

struct Walk {
    ctx: Arc<DispatchContext>,
    listeners: Arc<Vec<Registered>>,
    next: usize,
    emitted: usize,
    done: bool,
    span: Span,
}

fn walk(ctx: Arc<DispatchContext>, listeners: Arc<Vec<Registered>>, span: Span) -> EventResults {
    let state = Walk {
        ctx,
        listeners,
        next: 0,
        emitted: 0,
        done: false,
        span,
    };
    EventResults::new(stream::unfold(state, |mut state| async move {
        let item = state.step().await?;
        Some((item, state))
    }))
}

impl Walk {
    /// Advances to the next listener that produces a result.
    async fn step(&mut self) -> Option<ListenerResult> {
        while !self.done {
            if self.ctx.is_cancelled() || !self.ctx.is_propagating() {
                self.finish();
                break;
            }
            let Some(entry) = self.listeners.get(self.next).cloned() else {
                self.finish();
                break;
            };
            self.next += 1;

            let listener = &entry.listener;
            let span = debug_span!(
                parent: &self.span,
                "listener",
                id = %listener.id(),
                priority = listener.priority()
            );
            let ctx = Arc::clone(&self.ctx);
            let token = ctx.cancellation_token().clone();

            let passed = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                passed = listener.filter().evaluate(&ctx).instrument(span.clone()) => Some(passed),
            };
            let Some(passed) = passed else {
                self.finish();
                break;
            };
            if !passed {
                span.in_scope(|| trace!("Listener skipped"));
                continue;
            }

            let lctx = Arc::new(ListenerContext::new(ctx, Arc::clone(listener)));
            let chain = ListenerNext::start(entry.chain.clone());
            let invocation = AssertUnwindSafe(chain.proceed(lctx))
                .catch_unwind()
                .instrument(span.clone());

            let (result, cancelled) = tokio::select! {
                biased;
                _ = token.cancelled() => (EventResult::Error(ListenerError::Cancelled), true),
                outcome = invocation => match outcome {
                    Ok(result) => (result, false),
                    Err(payload) => {
                        let message = panic_message(&*payload);
                        (EventResult::Error(ListenerError::Panicked(message)), false)
                    }
                },
            };

            span.in_scope(|| trace!(kind = ?result.kind(), "Listener finished"));
            self.emitted += 1;
            if cancelled {
                self.finish();
            }
            return Some(ListenerResult::new(Arc::clone(listener.id_arc()), result));
        }
        None
    }

    fn finish(&mut self) {
        self.done = true;
        self.span.in_scope(|| {
            debug!(
                emitted = self.emitted,
                cancelled = self.ctx.is_cancelled(),
                propagating = self.ctx.is_propagating(),
                "Dispatch finished"
            )
        });
    }
}
