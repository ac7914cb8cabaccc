//! Route handlers and how the route table stores them.
//!
//! A [`RouteTable`](crate::RouteTable) holds a single value type, so each
//! `async fn(Request) -> impl IntoResponse` is wrapped once, at
//! registration, into a [`SharedEndpoint`]. Dispatch then costs one `Arc`
//! clone when the route is found and one dynamic call per request.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// The future every endpoint returns once its handler's output has been
/// converted into a [`Response`].
pub(crate) type ResponseFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

#[doc(hidden)]
pub trait Endpoint {
    fn call(&self, req: Request) -> ResponseFuture;
}

/// An endpoint as stored in the router's table and shared by every
/// connection that dispatches to it.
#[doc(hidden)]
pub type SharedEndpoint = Arc<dyn Endpoint + Send + Sync + 'static>;

/// Implemented by every function usable as a route handler:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// Closures returning a future work the same way. The trait is sealed.
pub trait Handler: sealed::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_endpoint(self) -> SharedEndpoint;
}

mod sealed {
    pub trait Sealed {}
}

impl<F, Fut, R> sealed::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_endpoint(self) -> SharedEndpoint {
        Arc::new(AsyncFnEndpoint(self))
    }
}

struct AsyncFnEndpoint<F>(F);

impl<F, Fut, R> Endpoint for AsyncFnEndpoint<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> ResponseFuture {
        let output = (self.0)(req);
        Box::pin(async move { output.await.into_response() })
    }
}
