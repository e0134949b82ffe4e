//! Extractor system for handler arguments.
//!
//! This module provides the [`FromContext`] trait, which defines how types
//! can be extracted from a [`ListenerContext`] for use as handler parameters.
//!
//! Built-in extractors:
//!
//! | Type                     | Extracts                                   |
//! |--------------------------|--------------------------------------------|
//! | `Arc<ListenerContext>`   | the full invocation context                |
//! | `BoxedEvent`             | the event being dispatched                 |
//! | [`EventOf<E>`]           | the event downcast to a concrete type `E`  |
//! | [`BoundArgs`]            | the bound keyword parameters               |
//! | [`State<T>`]             | a value stored by a listener interceptor   |
//! | `Option<T>`              | `T`, or `None` instead of failing          |

use std::ops::Deref;
use std::sync::Arc;

use warden_core::{BoxedEvent, Event};

use crate::binder::BoundArgs;
use crate::context::ListenerContext;
use crate::error::{ExtractError, ExtractResult};

/// A trait for types that can be extracted from a [`ListenerContext`].
///
/// If extraction fails, the handler is not called and the listener's result
/// is an [`EventResult::Error`](warden_core::EventResult::Error).
///
/// # Example
///
/// ```rust,ignore
/// struct Sender(String);
///
/// impl FromContext for Sender {
///     fn from_context(ctx: &Arc<ListenerContext>) -> ExtractResult<Self> {
///         ctx.event()
///             .author_id()
///             .map(|id| Sender(id.to_string()))
///             .ok_or_else(|| ExtractError::custom("event has no author"))
///     }
/// }
/// ```
pub trait FromContext: Sized {
    /// Attempts to extract this type from the given context.
    fn from_context(ctx: &Arc<ListenerContext>) -> ExtractResult<Self>;
}

impl FromContext for Arc<ListenerContext> {
    fn from_context(ctx: &Arc<ListenerContext>) -> ExtractResult<Self> {
        Ok(Arc::clone(ctx))
    }
}

impl FromContext for BoxedEvent {
    fn from_context(ctx: &Arc<ListenerContext>) -> ExtractResult<Self> {
        Ok(ctx.event().clone())
    }
}

impl FromContext for BoundArgs {
    fn from_context(ctx: &Arc<ListenerContext>) -> ExtractResult<Self> {
        ctx.args().cloned()
    }
}

/// Optional extraction never fails.
impl<T: FromContext> FromContext for Option<T> {
    fn from_context(ctx: &Arc<ListenerContext>) -> ExtractResult<Self> {
        Ok(T::from_context(ctx).ok())
    }
}

/// Extracts the event as a concrete type.
///
/// Fails with [`ExtractError::EventTypeMismatch`] if the event is of another
/// type, so wrap it in `Option` for listeners that accept several types.
pub struct EventOf<E> {
    event: BoxedEvent,
    _marker: std::marker::PhantomData<fn() -> E>,
}

impl<E> Clone for EventOf<E> {
    fn clone(&self) -> Self {
        Self {
            event: self.event.clone(),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<E> std::fmt::Debug for EventOf<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EventOf").field(&self.event).finish()
    }
}

impl<E: Event + 'static> EventOf<E> {
    pub fn boxed(&self) -> &BoxedEvent {
        &self.event
    }
}

impl<E: Event + 'static> Deref for EventOf<E> {
    type Target = E;

    fn deref(&self) -> &E {
        match self.event.downcast_ref::<E>() {
            Some(event) => event,
            None => unreachable!("EventOf is only constructed after a successful downcast"),
        }
    }
}

impl<E: Event + 'static> FromContext for EventOf<E> {
    fn from_context(ctx: &Arc<ListenerContext>) -> ExtractResult<Self> {
        let event = ctx.event();
        if !event.is::<E>() {
            return Err(ExtractError::EventTypeMismatch {
                expected: std::any::type_name::<E>(),
                got: event.event_name(),
            });
        }
        Ok(Self {
            event: event.clone(),
            _marker: std::marker::PhantomData,
        })
    }
}

/// Extracts a clone of a value stored with
/// [`ListenerContext::set_state`].
#[derive(Debug, Clone)]
pub struct State<T>(pub T);

impl<T> Deref for State<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Clone + Send + Sync + 'static> FromContext for State<T> {
    fn from_context(ctx: &Arc<ListenerContext>) -> ExtractResult<Self> {
        ctx.get_state::<T>()
            .map(State)
            .ok_or(ExtractError::StateMissing(std::any::type_name::<T>()))
    }
}
