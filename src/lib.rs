//! Composable decorators for a tower-based HTTP fetch.
//!
//! # Architecture Overview
//!
//! ```text
//!     caller ──▶ Logger ──▶ RequestId ──▶ DefaultHeaders ──▶ HttpFetch ──▶ network
//!                  │
//!                  └── Emitter (begin / success / error) ──▶ log function
//! ```
//!
//! Every decorator is a `tower::Layer`; the stack can be assembled by hand with
//! `tower::ServiceBuilder` or from a [`FetchConfig`] with [`FetchStack`].

pub mod config;
pub mod http;
pub mod observability;

pub use crate::config::schema::FetchConfig;
pub use crate::http::middleware::{DefaultHeadersLayer, EmitterLayer, LoggerLayer, RequestIdLayer};
pub use crate::http::{FetchError, FetchRequest, FetchStack, HttpFetch, Request, RequestInit};
