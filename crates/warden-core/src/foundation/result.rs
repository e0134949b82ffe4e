//! Listener outcomes.
//!
//! Every listener whose filters passed produces exactly one [`EventResult`]
//! per event. The dispatcher tags it with the listener's id and emits it as a
//! [`ListenerResult`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::error::ListenerError;

/// A type-erased, cheaply cloneable handler return value.
#[derive(Clone)]
pub struct ResultValue {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl ResultValue {
    /// Wraps a value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Attempts to view the value as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }

    /// Returns `true` if the value is of type `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Returns the Rust type name of the wrapped value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResultValue").field(&self.type_name).finish()
    }
}

/// The outcome of one listener handling one event.
#[derive(Debug)]
pub enum EventResult {
    /// The listener produced a value.
    Value(ResultValue),
    /// The listener ran but produced nothing.
    Empty,
    /// The listener declined the event without producing output.
    Invalid,
    /// Binding, an interceptor, or the handler failed.
    Error(ListenerError),
}

/// The kind of an [`EventResult`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Value,
    Empty,
    Invalid,
    Error,
}

impl EventResult {
    /// Wraps a value as a successful result.
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Self::Value(ResultValue::new(value))
    }

    /// Returns the kind of this result.
    pub fn kind(&self) -> ResultKind {
        match self {
            Self::Value(_) => ResultKind::Value,
            Self::Empty => ResultKind::Empty,
            Self::Invalid => ResultKind::Invalid,
            Self::Error(_) => ResultKind::Error,
        }
    }

    /// Returns `true` for `Value` and `Empty`.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Value(_) | Self::Empty)
    }

    /// Returns `true` for `Error`.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Returns the value as `T`, if this is a `Value` of that type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Value(v) => v.downcast_ref(),
            _ => None,
        }
    }

    /// Returns the error, if this is an `Error`.
    pub fn error(&self) -> Option<&ListenerError> {
        match self {
            Self::Error(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ListenerError> for EventResult {
    fn from(err: ListenerError) -> Self {
        Self::Error(err)
    }
}

/// An [`EventResult`] tagged with the listener that produced it.
#[derive(Debug)]
pub struct ListenerResult {
    /// The producing listener's id.
    pub listener_id: Arc<str>,
    /// The listener's outcome.
    pub result: EventResult,
}

impl ListenerResult {
    /// Creates a new tagged result.
    pub fn new(listener_id: Arc<str>, result: EventResult) -> Self {
        Self {
            listener_id,
            result,
        }
    }

    /// Returns the producing listener's id.
    pub fn listener_id(&self) -> &str {
        &self.listener_id
    }
}
