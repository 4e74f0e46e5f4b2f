//! Default request headers.
//!
//! Defaults sit below every other source of headers: a header already on the
//! request, whether set by the caller or by an outer layer, always wins. Keep
//! this layer innermost so that holds for the whole stack.

use std::sync::Arc;
use std::task::{Context, Poll};

use http::HeaderMap;
use tower::{Layer, Service};

use crate::http::headers::merge_headers;
use crate::http::request::{FetchRequest, Request};

/// Layer applying a fixed set of default headers.
#[derive(Debug, Clone)]
pub struct DefaultHeadersLayer {
    defaults: Arc<HeaderMap>,
}

impl DefaultHeadersLayer {
    pub fn new(defaults: HeaderMap) -> Self {
        Self {
            defaults: Arc::new(defaults),
        }
    }
}

impl<S> Layer<S> for DefaultHeadersLayer {
    type Service = DefaultHeaders<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DefaultHeaders {
            inner,
            defaults: self.defaults.clone(),
        }
    }
}

/// Service filling in default headers the request does not already carry.
#[derive(Debug, Clone)]
pub struct DefaultHeaders<S> {
    inner: S,
    defaults: Arc<HeaderMap>,
}

impl<S> DefaultHeaders<S> {
    pub fn new(inner: S, defaults: HeaderMap) -> Self {
        DefaultHeadersLayer::new(defaults).layer(inner)
    }

    fn apply(&self, request: FetchRequest) -> FetchRequest {
        match request {
            FetchRequest::Object(original) => {
                // Never touch the caller's object; it may be reused.
                let mut cloned = Request::clone(&original);
                let mut merged = HeaderMap::clone(&self.defaults);
                merge_headers(&mut merged, [&cloned.headers]);
                cloned.headers = merged;
                FetchRequest::Object(Arc::new(cloned))
            }
            FetchRequest::Locator { url, mut init } => {
                let explicit = init.headers.take().unwrap_or_default();
                let mut merged = HeaderMap::new();
                merge_headers(&mut merged, [&*self.defaults, &explicit]);
                init.headers = Some(merged);
                FetchRequest::Locator { url, init }
            }
        }
    }
}

impl<S> Service<FetchRequest> for DefaultHeaders<S>
where
    S: Service<FetchRequest>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: FetchRequest) -> Self::Future {
        let request = self.apply(request);
        tracing::trace!(
            url = %request.url_str(),
            defaults = self.defaults.len(),
            "applied default headers"
        );
        self.inner.call(request)
    }
}
