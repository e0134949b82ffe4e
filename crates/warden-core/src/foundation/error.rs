//! Unified error types for the Warden core framework.
//!
//! These errors describe what can go wrong while one listener handles one
//! event ([`ListenerError`]) and what can abort a whole dispatch pass
//! ([`DispatchError`]). Framework-level errors (keyword compilation, filter
//! evaluation, extraction) are defined in `warden-framework`.

use thiserror::Error;

/// Boxed error type for user-supplied failure causes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Bind Errors
// =============================================================================

/// Errors raised while binding keyword captures to handler parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// A required parameter without a default was not captured by any keyword.
    #[error("required parameter '{name}' was not captured by any keyword")]
    Missing {
        /// The parameter name.
        name: String,
    },

    /// The captured text could not be converted into the parameter's type.
    #[error("cannot convert parameter '{name}' from {raw:?}: {reason}")]
    Conversion {
        /// The parameter name.
        name: String,
        /// The captured text.
        raw: String,
        /// Why the conversion failed.
        reason: String,
    },
}

impl BindError {
    /// Creates a missing-parameter error.
    pub fn missing(name: impl Into<String>) -> Self {
        Self::Missing { name: name.into() }
    }
}

// =============================================================================
// Listener Errors
// =============================================================================

/// Failure of a single listener invocation.
///
/// These never stop the dispatch pass. They are reported inline as
/// [`EventResult::Error`](super::result::EventResult::Error) at the position
/// of the failing listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Parameter binding failed; the handler was not invoked.
    #[error(transparent)]
    Bind(#[from] BindError),

    /// A handler argument could not be extracted from the context.
    #[error("failed to extract handler argument: {0}")]
    Extract(String),

    /// The handler body returned an error.
    #[error("handler failed: {0}")]
    Handler(BoxError),

    /// A listener-scope interceptor failed.
    #[error("listener interceptor failed: {0}")]
    Interceptor(BoxError),

    /// The handler or one of its interceptors panicked.
    #[error("listener panicked: {0}")]
    Panicked(String),

    /// The dispatch was cancelled while this listener was running.
    #[error("dispatch cancelled")]
    Cancelled,
}

impl ListenerError {
    /// Wraps any error as a handler failure.
    pub fn handler(err: impl Into<BoxError>) -> Self {
        Self::Handler(err.into())
    }

    /// Wraps any error as an interceptor failure.
    pub fn interceptor(err: impl Into<BoxError>) -> Self {
        Self::Interceptor(err.into())
    }
}

// =============================================================================
// Dispatch Errors
// =============================================================================

/// Errors that abort an entire dispatch pass.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A processing-scope interceptor failed.
    #[error("processing interceptor failed: {0}")]
    Interceptor(BoxError),

    /// The dispatch was cancelled before it started walking listeners.
    #[error("dispatch cancelled")]
    Cancelled,
}

impl DispatchError {
    /// Wraps any error as a processing interceptor failure.
    pub fn interceptor(err: impl Into<BoxError>) -> Self {
        Self::Interceptor(err.into())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for binding operations.
pub type BindResult<T> = Result<T, BindError>;

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
