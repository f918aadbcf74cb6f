//! Handler and middleware composition.
//!
//! A [`Middleware`] turns one [`Handler`] into another. [`compose`] wraps a
//! base handler with the fixed default-headers step first, then with each
//! middleware so that the first one in the sequence ends up outermost:
//!
//! ```text
//! compose(h, [a, b])  ==  a(b(default_headers(h)))
//!
//! request  → a pre → b pre → default headers → h
//! response ← a post ← b post ← default headers ←
//! ```
//!
//! Composition happens once when a route table is compiled; all effects
//! happen per request when the composed handler runs.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, Request},
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;
use uuid::Uuid;

/// A request handler as stored in a route table.
pub type Handler = Arc<dyn Fn(Request<Body>) -> BoxFuture<'static, Response> + Send + Sync>;

/// A handler-to-handler transformation.
pub type Middleware = Arc<dyn Fn(Handler) -> Handler + Send + Sync>;

/// Response header carrying the request identifier.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Headers set on every routed response unless the handler set them itself.
pub const DEFAULT_HEADERS: [(HeaderName, &str); 2] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::CACHE_CONTROL, "no-store"),
];

/// Wrap an async function as a [`Handler`].
pub fn handler<F, Fut, R>(f: F) -> Handler
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    Arc::new(move |request: Request<Body>| -> BoxFuture<'static, Response> {
        let fut = f(request);
        Box::pin(async move { fut.await.into_response() })
    })
}

/// Build a [`Middleware`] from an around-style function receiving the
/// request and the next handler in the chain.
///
/// Returning without calling `next` short-circuits the chain.
pub fn from_fn<F, Fut>(f: F) -> Middleware
where
    F: Fn(Request<Body>, Handler) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    let f = Arc::new(f);
    Arc::new(move |next: Handler| -> Handler {
        let f = Arc::clone(&f);
        Arc::new(move |request: Request<Body>| -> BoxFuture<'static, Response> {
            Box::pin(f(request, Arc::clone(&next)))
        })
    })
}

/// Compose `base` with the default-headers step and `middleware`.
pub fn compose(base: Handler, middleware: &[Middleware]) -> Handler {
    middleware
        .iter()
        .rev()
        .fold(default_headers(base), |inner, wrap| wrap(inner))
}

/// The innermost wrapper around every routed handler.
fn default_headers(inner: Handler) -> Handler {
    Arc::new(move |request: Request<Body>| -> BoxFuture<'static, Response> {
        let fut = inner(request);
        Box::pin(async move {
            let mut response = fut.await;
            let headers = response.headers_mut();
            for (name, value) in DEFAULT_HEADERS {
                headers
                    .entry(name)
                    .or_insert(HeaderValue::from_static(value));
            }
            response
        })
    })
}

/// Tag each request with an `x-request-id`, reusing the inbound one if any,
/// and echo it on the response.
pub fn request_id() -> Middleware {
    from_fn(|mut request, next| async move {
        let id = match request.headers().get(&X_REQUEST_ID) {
            Some(value) => value.clone(),
            None => {
                let generated = HeaderValue::from_str(&Uuid::new_v4().to_string())
                    .unwrap_or(HeaderValue::from_static("unknown"));
                request.headers_mut().insert(X_REQUEST_ID, generated.clone());
                generated
            }
        };

        let mut response = next(request).await;
        response.headers_mut().insert(X_REQUEST_ID, id);
        response
    })
}

/// Emit a debug event per request with its outcome and latency.
pub fn trace() -> Middleware {
    from_fn(|request, next| async move {
        let started = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let response = next(request).await;

        tracing::debug!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            latency = ?started.elapsed(),
            "Request handled"
        );
        response
    })
}
