//! Fetch handling subsystem.
//!
//! # Data Flow
//! ```text
//! FetchRequest (url + init, or shared request object)
//!     → middleware/ (logger, request id, default headers)
//!     → client.rs (reqwest-backed fetch)
//!     → reqwest::Response / FetchError, returned unchanged through every layer
//! ```

pub mod client;
pub mod headers;
pub mod middleware;
pub mod request;
pub mod stack;

pub use client::{FetchError, HttpFetch};
pub use headers::{header_map, merge_headers, HeaderError};
pub use request::{FetchRequest, Request, RequestInit};
pub use stack::{FetchService, FetchStack};
