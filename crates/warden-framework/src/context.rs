//! Dispatch and listener contexts.
//!
//! This module provides the two context types that together model how one
//! event is processed across many listeners:
//!
//! - [`DispatchContext`] is the **shared** base for one dispatch pass. A
//!   single `Arc<DispatchContext>` is created per incoming event and handed
//!   to filters, processing interceptors and every listener. It holds the
//!   event, the propagation flag and the cancellation token.
//!
//! - [`ListenerContext`] is the context for **one** listener invocation. It
//!   combines the shared base with the listener's registration, its bound
//!   arguments and an isolated state map that listener interceptors can use
//!   to pass data to the handler. Calling
//!   [`stop_propagation`](ListenerContext::stop_propagation) writes through
//!   to the shared base, so no later listener sees the event.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use warden_core::BoxedEvent;

use crate::binder::BoundArgs;
use crate::error::{ExtractError, ExtractResult};
use crate::keyword::Keyword;
use crate::listener::Listener;

// =============================================================================
// DispatchContext: shared base, one per dispatch pass
// =============================================================================

/// The shared context for a single event dispatch pass.
pub struct DispatchContext {
    event: BoxedEvent,
    /// Cleared by any listener that calls `stop_propagation`.
    is_propagating: AtomicBool,
    cancel: CancellationToken,
}

impl DispatchContext {
    /// Creates a context with a fresh cancellation token.
    pub fn new(event: BoxedEvent) -> Self {
        Self::with_cancellation(event, CancellationToken::new())
    }

    /// Creates a context bound to an existing cancellation token.
    pub fn with_cancellation(event: BoxedEvent, cancel: CancellationToken) -> Self {
        Self {
            event,
            is_propagating: AtomicBool::new(true),
            cancel,
        }
    }

    /// Returns the event being dispatched.
    pub fn event(&self) -> &BoxedEvent {
        &self.event
    }

    /// Stops delivery of this event to any listener not yet reached.
    pub fn stop_propagation(&self) {
        self.is_propagating.store(false, Ordering::SeqCst);
    }

    /// Returns `true` until some listener stops propagation.
    pub fn is_propagating(&self) -> bool {
        self.is_propagating.load(Ordering::SeqCst)
    }

    /// Returns the token that cancels this dispatch pass.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl std::fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchContext")
            .field("event", &self.event)
            .field("is_propagating", &self.is_propagating())
            .field("is_cancelled", &self.is_cancelled())
            .finish()
    }
}

// =============================================================================
// ListenerContext: one per listener invocation
// =============================================================================

/// The context handed to listener interceptors and handlers.
///
/// # Example
///
/// ```rust,ignore
/// async fn handle(ctx: Arc<ListenerContext>) -> String {
///     let target = ctx.args()?.get_str("target").unwrap_or_default();
///     ctx.stop_propagation();
///     format!("banned {target}")
/// }
/// ```
pub struct ListenerContext {
    base: Arc<DispatchContext>,
    listener: Arc<Listener>,
    args: OnceLock<BoundArgs>,
    state: Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl ListenerContext {
    pub(crate) fn new(base: Arc<DispatchContext>, listener: Arc<Listener>) -> Self {
        Self {
            base,
            listener,
            args: OnceLock::new(),
            state: Mutex::new(HashMap::new()),
        }
    }

    // ─── Shared base delegation ───────────────────────────────────────────────

    /// Returns the event being dispatched.
    pub fn event(&self) -> &BoxedEvent {
        self.base.event()
    }

    /// Returns the shared dispatch context.
    pub fn dispatch(&self) -> &Arc<DispatchContext> {
        &self.base
    }

    /// Stops delivery of this event to any listener after this one.
    pub fn stop_propagation(&self) {
        self.base.stop_propagation();
    }

    pub fn is_propagating(&self) -> bool {
        self.base.is_propagating()
    }

    pub fn is_cancelled(&self) -> bool {
        self.base.is_cancelled()
    }

    // ─── Listener-specific ────────────────────────────────────────────────────

    /// Returns the id of the listener being invoked.
    pub fn listener_id(&self) -> &str {
        self.listener.id()
    }

    /// Returns the listener's priority.
    pub fn priority(&self) -> i32 {
        self.listener.priority()
    }

    /// Returns the keywords owned by the listener, in filter-declaration order.
    pub fn keywords(&self) -> &[Keyword] {
        self.listener.keywords()
    }

    pub(crate) fn listener(&self) -> &Arc<Listener> {
        &self.listener
    }

    /// Returns the handler arguments bound for this invocation.
    ///
    /// Fails if called before binding ran, for example from a listener
    /// interceptor ahead of `proceed`.
    pub fn args(&self) -> ExtractResult<&BoundArgs> {
        self.args.get().ok_or(ExtractError::ArgsNotBound)
    }

    pub(crate) fn set_args(&self, args: BoundArgs) {
        // Binding runs at most once per invocation; a second terminal call
        // keeps the first result.
        let _ = self.args.set(args);
    }

    /// Stores a value in this invocation's state map.
    ///
    /// Only one value per type can be stored; subsequent calls overwrite.
    pub fn set_state<T: Send + Sync + 'static>(&self, value: T) {
        self.state.lock().insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a cloned value from this invocation's state map.
    pub fn get_state<T: Clone + 'static>(&self) -> Option<T> {
        self.state
            .lock()
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    /// Returns `true` if a value of type `T` has been stored.
    pub fn has_state<T: 'static>(&self) -> bool {
        self.state.lock().contains_key(&TypeId::of::<T>())
    }

    /// Removes and returns a value from this invocation's state map.
    pub fn take_state<T: 'static>(&self) -> Option<T> {
        self.state
            .lock()
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }
}

impl std::fmt::Debug for ListenerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerContext")
            .field("listener", &self.listener.id())
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}
