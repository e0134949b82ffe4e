//! Tower integration for listener interceptors.
//!
//! [`TowerInterceptor`] wraps any [`tower::Layer`] as a
//! [`ListenerInterceptor`]. The rest of the chain is exposed to the layer as
//! a one-shot [`NextService`], so standard tower middleware such as
//! `TimeoutLayer` or `MapResponseLayer` can wrap a listener invocation:
//!
//! ```rust,ignore
//! use tower::timeout::TimeoutLayer;
//!
//! Listener::builder("slow")
//!     .interceptor(
//!         TowerInterceptor::new(TimeoutLayer::new(Duration::from_secs(5))),
//!         Priority::NORMAL,
//!     )
//!     .handler(slow_handler);
//! ```

use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use tower::{Layer, Service, ServiceExt};
use warden_core::EventResult;

use super::{ListenerInterceptor, ListenerNext};
use crate::context::ListenerContext;
use crate::error::BoxError;

/// The remainder of a listener chain as a tower [`Service`].
///
/// Can be called once; a second call fails.
pub struct NextService {
    next: Option<ListenerNext>,
}

impl NextService {
    pub fn new(next: ListenerNext) -> Self {
        Self { next: Some(next) }
    }
}

impl Service<Arc<ListenerContext>> for NextService {
    type Response = EventResult;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<EventResult, BoxError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, ctx: Arc<ListenerContext>) -> Self::Future {
        match self.next.take() {
            Some(next) => next.proceed(ctx).map(Ok).boxed(),
            None => futures::future::ready(Err("listener chain already proceeded".into())).boxed(),
        }
    }
}

/// Adapts a tower [`Layer`] into a [`ListenerInterceptor`].
#[derive(Debug, Clone)]
pub struct TowerInterceptor<L> {
    layer: L,
}

impl<L> TowerInterceptor<L> {
    pub fn new(layer: L) -> Self {
        Self { layer }
    }
}

#[async_trait]
impl<L> ListenerInterceptor for TowerInterceptor<L>
where
    L: Layer<NextService> + Send + Sync + 'static,
    L::Service: Service<Arc<ListenerContext>, Response = EventResult> + Send + 'static,
    <L::Service as Service<Arc<ListenerContext>>>::Error: Into<BoxError>,
    <L::Service as Service<Arc<ListenerContext>>>::Future: Send,
{
    async fn intercept(
        &self,
        ctx: Arc<ListenerContext>,
        next: ListenerNext,
    ) -> Result<EventResult, BoxError> {
        let service = self.layer.layer(NextService::new(next));
        service.oneshot(ctx).await.map_err(Into::into)
    }
}
