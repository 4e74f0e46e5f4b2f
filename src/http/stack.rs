//! Decorator stack assembly.
//!
//! # Data Flow
//! ```text
//! caller
//!     → Logger (begin / success / error log lines)
//!     → RequestId (fresh id, overrides caller value)
//!     → DefaultHeaders (fills gaps only)
//!     → inner fetch (e.g. HttpFetch)
//! ```
//!
//! Disabled layers are left out entirely rather than passed through.

use std::fmt;

use tower::util::BoxCloneService;
use tower::{Service, ServiceBuilder};

use crate::config::loader::ConfigError;
use crate::config::schema::FetchConfig;
use crate::http::headers::{header_map, parse_header_name};
use crate::http::middleware::{DefaultHeadersLayer, LoggerLayer, RequestIdLayer};
use crate::http::request::FetchRequest;

/// A fully decorated, type-erased fetch.
pub type FetchService<R, E> = BoxCloneService<FetchRequest, R, E>;

/// Builds decorator stacks from configuration.
pub struct FetchStack;

impl FetchStack {
    /// Wrap `inner` with every layer enabled in `config`.
    pub fn from_config<S>(config: &FetchConfig, inner: S) -> Result<FetchService<S::Response, S::Error>, ConfigError>
    where
        S: Service<FetchRequest> + Clone + Send + 'static,
        S::Future: Send + 'static,
        S::Response: Send + 'static,
        S::Error: fmt::Display + Send + 'static,
    {
        let defaults = header_map(&config.default_headers)?;

        let request_id = if config.request_id.enabled {
            let header_name = parse_header_name(&config.request_id.header_name)?;
            Some(RequestIdLayer::new().header_name(header_name))
        } else {
            None
        };

        let logger = config.logging.enabled.then(|| {
            LoggerLayer::<S::Response, S::Error>::tracing().with_shared_timer(config.timer.source())
        });

        tracing::debug!(
            default_headers = defaults.len(),
            request_id = request_id.is_some(),
            logging = logger.is_some(),
            "building fetch stack"
        );

        let service = ServiceBuilder::new()
            .option_layer(logger)
            .option_layer(request_id)
            .layer(DefaultHeadersLayer::new(defaults))
            .service(inner);

        Ok(BoxCloneService::new(service))
    }
}
