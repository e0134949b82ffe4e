//! Foundation layer: events, message segments, results and errors.

pub mod error;
pub mod event;
pub mod message;
pub mod result;

pub use error::{
    BindError, BindResult, BoxError, DispatchError, DispatchResult, ListenerError,
};
pub use event::{BoxedEvent, Event, EventType};
pub use message::RichTextSegment;
pub use result::{EventResult, ListenerResult, ResultKind, ResultValue};
