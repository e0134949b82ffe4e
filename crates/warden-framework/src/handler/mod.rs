//! Handler system for listeners.
//!
//! Handlers are implemented via blanket implementations for async functions
//! with different arities, similar to Axum's handler system:
//!
//! - every argument implements [`FromContext`]
//! - the return value implements [`IntoEventResult`]
//!
//! # Example
//!
//! ```rust,ignore
//! // No parameters, no output: the listener's result is `Empty`.
//! async fn on_any_event() {}
//!
//! // Bound keyword arguments in, a value out.
//! async fn ban(args: BoundArgs) -> String {
//!     format!("banned {}", args.get_str("target").unwrap_or_default())
//! }
//!
//! // Errors become `EventResult::Error` at this listener's position.
//! async fn lookup(ctx: Arc<ListenerContext>) -> Result<u64, std::io::Error> {
//!     // ...
//! }
//! ```

mod response;

pub use response::IntoEventResult;

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use warden_core::{EventResult, ListenerError};

use crate::context::ListenerContext;
use crate::extractor::FromContext;

// ============================================================================
// Handler Trait
// ============================================================================

/// The core trait for listener handlers.
///
/// Implemented automatically for async functions taking 0-12 [`FromContext`]
/// arguments and returning an [`IntoEventResult`].
pub trait Handler<T>: Clone + Send + Sync + 'static {
    /// Calls the handler with the given context.
    fn call(self, ctx: Arc<ListenerContext>) -> BoxFuture<'static, EventResult>;
}

// ============================================================================
// BoxedHandler - Type-erased handler stored in listeners
// ============================================================================

/// A type-erased handler.
///
/// Internally a closure that captures the original handler and calls it
/// with a cloned copy on each invocation.
pub type BoxedHandler =
    Arc<dyn Fn(Arc<ListenerContext>) -> BoxFuture<'static, EventResult> + Send + Sync>;

/// Converts a handler function into a boxed handler.
pub fn into_handler<F, T>(f: F) -> BoxedHandler
where
    F: Handler<T>,
    T: 'static,
{
    Arc::new(move |ctx| f.clone().call(ctx))
}

// ============================================================================
// Handler implementations for functions (Axum-style)
// ============================================================================

/// Generates Handler implementations for functions with different arities.
macro_rules! impl_handler {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case, unused_variables)]
        impl<F, Fut, Res, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = Res> + Send + 'static,
            Res: IntoEventResult,
            $( $ty: FromContext + Send + 'static, )*
        {
            fn call(self, ctx: Arc<ListenerContext>) -> BoxFuture<'static, EventResult> {
                $(
                    let $ty = match $ty::from_context(&ctx) {
                        Ok(value) => value,
                        Err(err) => {
                            let error = ListenerError::Extract(err.to_string());
                            return futures::future::ready(EventResult::Error(error)).boxed();
                        }
                    };
                )*

                let fut = (self)($($ty,)*);
                async move { fut.await.into_event_result() }.boxed()
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);
