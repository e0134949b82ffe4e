//! Error types for the Warden framework.

use thiserror::Error;

pub use warden_core::BoxError;

/// Errors raised while compiling a [`Keyword`](crate::keyword::Keyword).
#[derive(Debug, Clone, Error)]
pub enum KeywordError {
    /// A `{{` was not followed by a closing `}}`.
    #[error("unclosed placeholder in keyword {text:?}")]
    UnclosedPlaceholder {
        /// The keyword source text.
        text: String,
    },

    /// A placeholder name is not a valid capture group name.
    #[error("invalid parameter name {name:?} in keyword {text:?}")]
    InvalidParamName {
        /// The offending name.
        name: String,
        /// The keyword source text.
        text: String,
    },

    /// The generated regular expression failed to compile.
    #[error("invalid keyword pattern {text:?}: {source}")]
    InvalidPattern {
        /// The keyword source text.
        text: String,
        /// The regex compilation error.
        #[source]
        source: regex::Error,
    },
}

/// A filter failed to evaluate.
///
/// Never surfaced to callers: the dispatcher logs it and treats the failing
/// filter as `false`.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The filter predicate returned an error.
    #[error("filter returned an error: {0}")]
    Failed(BoxError),

    /// The filter predicate panicked.
    #[error("filter panicked: {0}")]
    Panicked(String),
}

/// Errors that can occur during handler argument extraction.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// Handler arguments were requested before binding ran.
    #[error("handler arguments have not been bound for this invocation")]
    ArgsNotBound,

    /// A state value of the requested type was not stored by any interceptor.
    #[error("no state of type '{0}' in listener context")]
    StateMissing(&'static str),

    /// The event is not of the requested concrete type.
    #[error("event type mismatch: expected '{expected}', got '{got}'")]
    EventTypeMismatch {
        /// Expected type name.
        expected: &'static str,
        /// Actual event name.
        got: &'static str,
    },

    /// Custom extraction error.
    #[error("{0}")]
    Custom(String),
}

impl ExtractError {
    /// Creates a custom extraction error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Result type for keyword compilation.
pub type KeywordResult<T> = Result<T, KeywordError>;

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
