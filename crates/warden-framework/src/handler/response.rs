//! Conversion of handler return values into [`EventResult`]s.

use warden_core::{BoxError, EventResult, ListenerError};

/// A trait for types a handler may return.
///
/// `()` and `None` map to [`EventResult::Empty`], `Err` maps to
/// [`ListenerError::Handler`], and plain values are wrapped as
/// [`EventResult::Value`].
pub trait IntoEventResult: Send + 'static {
    fn into_event_result(self) -> EventResult;
}

impl IntoEventResult for EventResult {
    fn into_event_result(self) -> EventResult {
        self
    }
}

impl IntoEventResult for () {
    fn into_event_result(self) -> EventResult {
        EventResult::Empty
    }
}

impl<T: IntoEventResult> IntoEventResult for Option<T> {
    fn into_event_result(self) -> EventResult {
        match self {
            Some(value) => value.into_event_result(),
            None => EventResult::Empty,
        }
    }
}

impl<T, E> IntoEventResult for Result<T, E>
where
    T: IntoEventResult,
    E: Into<BoxError> + Send + 'static,
{
    fn into_event_result(self) -> EventResult {
        match self {
            Ok(value) => value.into_event_result(),
            Err(err) => EventResult::Error(ListenerError::handler(err)),
        }
    }
}

macro_rules! impl_value_result {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoEventResult for $ty {
                fn into_event_result(self) -> EventResult {
                    EventResult::value(self)
                }
            }
        )*
    };
}

impl_value_result!(
    String,
    &'static str,
    bool,
    i32,
    i64,
    u32,
    u64,
    f64,
    serde_json::Value,
);
