//! Fetch decorators.
//!
//! Every decorator is a `tower::Layer` whose service keeps the wrapped
//! service's request, response and error types, so layers stack freely.
//!
//! # Layers
//! - `default_headers.rs`: headers applied beneath everything else
//! - `request_id.rs`: generated id header, overriding the caller
//! - `emitter.rs`: timed begin / success / error notifications
//! - `logger.rs`: emitter events forwarded to a log function
//!
//! # Design Decisions
//! - No decorator creates errors of its own; inner errors pass through untouched
//! - Configuration is captured once when the layer is built

pub mod default_headers;
pub mod emitter;
pub mod logger;
pub mod request_id;

pub use default_headers::{DefaultHeaders, DefaultHeadersLayer};
pub use emitter::{
    BeginEvent, Emitter, EmitterLayer, ErrorEvent, FetchEmitter, FetchEvent, FetchEventKind,
    SubscriptionId, SuccessEvent,
};
pub use logger::{tracing_log, LogFn, Logger, LoggerLayer};
pub use request_id::{GenerateRequestId, RequestId, RequestIdLayer, UuidV7, X_REQUEST_ID};
