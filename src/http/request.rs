//! Fetch request descriptors.
//!
//! # Responsibilities
//! - Model the two shapes a fetch can be invoked with
//! - Give decorators uniform access to headers, method and url
//!
//! # Design Decisions
//! - Request objects are shared through `Arc`; a decorator that needs to change
//!   one clones it first, so a caller reusing the same request never sees edits
//! - Locator calls carry a `RequestInit` whose fields are all optional

use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};

/// A complete, reusable request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Per-call options accompanying a url locator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestInit {
    /// Defaults to `GET` when absent.
    pub method: Option<Method>,
    /// Absent headers are treated as an empty collection.
    pub headers: Option<HeaderMap>,
    pub body: Option<Bytes>,
}

/// The input of a fetch call.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchRequest {
    /// A request object, possibly shared with the caller.
    Object(Arc<Request>),
    /// A url plus call options.
    Locator { url: String, init: RequestInit },
}

impl FetchRequest {
    /// A plain `GET` of `url` with no options.
    pub fn url(url: impl Into<String>) -> Self {
        Self::with_init(url, RequestInit::default())
    }

    pub fn with_init(url: impl Into<String>, init: RequestInit) -> Self {
        FetchRequest::Locator {
            url: url.into(),
            init,
        }
    }

    pub fn object(request: impl Into<Arc<Request>>) -> Self {
        FetchRequest::Object(request.into())
    }

    pub fn url_str(&self) -> &str {
        match self {
            FetchRequest::Object(request) => &request.url,
            FetchRequest::Locator { url, .. } => url,
        }
    }

    pub fn method(&self) -> Method {
        match self {
            FetchRequest::Object(request) => request.method.clone(),
            FetchRequest::Locator { init, .. } => init.method.clone().unwrap_or(Method::GET),
        }
    }

    /// Headers carried by the request, `None` when a locator call set none.
    pub fn headers(&self) -> Option<&HeaderMap> {
        match self {
            FetchRequest::Object(request) => Some(&request.headers),
            FetchRequest::Locator { init, .. } => init.headers.as_ref(),
        }
    }

    /// Split into `(method, url, headers, body)`, cloning a shared object only
    /// when another owner still holds it.
    pub fn into_parts(self) -> (Method, String, HeaderMap, Option<Bytes>) {
        match self {
            FetchRequest::Object(request) => {
                let Request {
                    method,
                    url,
                    headers,
                    body,
                } = Arc::unwrap_or_clone(request);
                (method, url, headers, body)
            }
            FetchRequest::Locator { url, init } => (
                init.method.unwrap_or(Method::GET),
                url,
                init.headers.unwrap_or_default(),
                init.body,
            ),
        }
    }
}

impl From<Request> for FetchRequest {
    fn from(request: Request) -> Self {
        FetchRequest::object(request)
    }
}

impl From<&str> for FetchRequest {
    fn from(url: &str) -> Self {
        FetchRequest::url(url)
    }
}
