//! Request ID tagging.
//!
//! # Responsibilities
//! - Generate a fresh identifier for every call
//! - Set it on the configured header, replacing any caller-supplied value
//!
//! # Design Decisions
//! - Default header is `x-request-id` (names are case-insensitive)
//! - Default identifiers are UUIDv7: time-ordered, no shared counter
//! - Generators must be callable concurrently; they are shared through `Arc`

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::{HeaderMap, HeaderName, HeaderValue};
use tower::{Layer, Service};
use uuid::Uuid;

use crate::http::headers::merge_headers;
use crate::http::request::{FetchRequest, Request};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Produces request identifiers.
pub trait GenerateRequestId: Send + Sync + 'static {
    fn generate_request_id(&self) -> HeaderValue;
}

impl<F> GenerateRequestId for F
where
    F: Fn() -> HeaderValue + Send + Sync + 'static,
{
    fn generate_request_id(&self) -> HeaderValue {
        self()
    }
}

/// Time-ordered UUIDs (version 7).
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV7;

impl GenerateRequestId for UuidV7 {
    fn generate_request_id(&self) -> HeaderValue {
        let mut buf = Uuid::encode_buffer();
        let id = Uuid::now_v7().hyphenated().encode_lower(&mut buf);
        HeaderValue::from_str(id).expect("hyphenated uuid is a valid header value")
    }
}

/// Layer tagging every call with a generated request ID.
#[derive(Clone)]
pub struct RequestIdLayer {
    header_name: HeaderName,
    generator: Arc<dyn GenerateRequestId>,
}

impl RequestIdLayer {
    /// `x-request-id` filled with UUIDv7 values.
    pub fn new() -> Self {
        Self {
            header_name: X_REQUEST_ID,
            generator: Arc::new(UuidV7),
        }
    }

    pub fn header_name(mut self, header_name: HeaderName) -> Self {
        self.header_name = header_name;
        self
    }

    pub fn generator<G: GenerateRequestId>(mut self, generator: G) -> Self {
        self.generator = Arc::new(generator);
        self
    }
}

impl Default for RequestIdLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequestIdLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestIdLayer")
            .field("header_name", &self.header_name)
            .finish_non_exhaustive()
    }
}

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestId<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestId {
            inner,
            header_name: self.header_name.clone(),
            generator: self.generator.clone(),
        }
    }
}

/// Service setting a generated request ID header on every call.
#[derive(Clone)]
pub struct RequestId<S> {
    inner: S,
    header_name: HeaderName,
    generator: Arc<dyn GenerateRequestId>,
}

impl<S> RequestId<S> {
    fn apply(&self, request: FetchRequest, id: HeaderValue) -> FetchRequest {
        let mut generated = HeaderMap::new();
        generated.insert(self.header_name.clone(), id);

        match request {
            FetchRequest::Object(original) => {
                let mut cloned = Request::clone(&original);
                merge_headers(&mut cloned.headers, [&generated]);
                FetchRequest::Object(Arc::new(cloned))
            }
            FetchRequest::Locator { url, mut init } => {
                let mut merged = init.headers.take().unwrap_or_default();
                merge_headers(&mut merged, [&generated]);
                init.headers = Some(merged);
                FetchRequest::Locator { url, init }
            }
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for RequestId<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestId")
            .field("inner", &self.inner)
            .field("header_name", &self.header_name)
            .finish_non_exhaustive()
    }
}

impl<S> Service<FetchRequest> for RequestId<S>
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
        let id = self.generator.generate_request_id();
        tracing::debug!(
            header = %self.header_name,
            request_id = ?id,
            url = %request.url_str(),
            "tagged fetch with request id"
        );
        let request = self.apply(request, id);
        self.inner.call(request)
    }
}
