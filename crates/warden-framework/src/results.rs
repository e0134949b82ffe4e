//! The lazily produced output of one dispatch pass.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{BoxStream, Stream, StreamExt};
use warden_core::{ListenerResult, ResultValue};

/// An ordered, lazily produced sequence of [`ListenerResult`]s.
///
/// Nothing beyond the listener currently being evaluated runs until the
/// stream is polled again, so a consumer may stop early (for example with
/// [`first_value`](Self::first_value)) without forcing the remaining
/// listeners. Dropping the stream drops any in-flight invocation.
///
/// Consumption styles:
///
/// ```rust,ignore
/// // Async stream
/// while let Some(item) = results.next().await { /* ... */ }
///
/// // Push callback
/// results.for_each(|item| async move { println!("{item:?}") }).await;
///
/// // Blocking iterator, outside of an async context
/// for item in results.into_blocking() { /* ... */ }
/// ```
pub struct EventResults {
    inner: BoxStream<'static, ListenerResult>,
}

impl EventResults {
    pub fn new(stream: impl Stream<Item = ListenerResult> + Send + 'static) -> Self {
        Self {
            inner: stream.boxed(),
        }
    }

    /// A sequence with no results.
    pub fn empty() -> Self {
        Self::new(futures::stream::empty())
    }

    /// Drives the sequence to completion.
    pub async fn collect_all(self) -> Vec<ListenerResult> {
        self.collect().await
    }

    /// Returns the first `Value` result, leaving later listeners unevaluated.
    pub async fn first_value(mut self) -> Option<(ListenerResult, ResultValue)> {
        while let Some(item) = self.next().await {
            if let warden_core::EventResult::Value(value) = &item.result {
                let value = value.clone();
                return Some((item, value));
            }
        }
        None
    }

    /// Converts into a blocking iterator.
    ///
    /// Each `next()` drives the underlying stream on the current thread. Do
    /// not call this from inside an async runtime worker.
    pub fn into_blocking(self) -> futures::executor::BlockingStream<Self> {
        futures::executor::block_on_stream(self)
    }
}

impl Stream for EventResults {
    type Item = ListenerResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl fmt::Debug for EventResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventResults").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use warden_core::EventResult;

    use super::*;

    fn item(id: &str, result: EventResult) -> ListenerResult {
        ListenerResult::new(Arc::from(id), result)
    }

    #[tokio::test]
    async fn test_first_value_skips_non_values() {
        let results = EventResults::new(futures::stream::iter(vec![
            item("a", EventResult::Empty),
            item("b", EventResult::value(3_i32)),
            item("c", EventResult::value(4_i32)),
        ]));
        let (first, value) = results.first_value().await.unwrap();
        assert_eq!(first.listener_id(), "b");
        assert_eq!(value.downcast_ref::<i32>(), Some(&3));
    }

    #[test]
    fn test_blocking_iterator() {
        let results = EventResults::new(futures::stream::iter(vec![
            item("a", EventResult::Empty),
            item("b", EventResult::Invalid),
        ]));
        let ids: Vec<_> = results
            .into_blocking()
            .map(|r| r.listener_id().to_string())
            .collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_empty() {
        assert!(EventResults::empty().collect_all().await.is_empty());
    }
}
