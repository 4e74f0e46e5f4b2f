//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check header names and values are legal HTTP
//! - Check the log level is one the subscriber understands
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FetchConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::str::FromStr;

use http::{HeaderName, HeaderValue};
use tracing::level_filters::LevelFilter;

use crate::config::schema::FetchConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("default header name {0:?} is not a valid HTTP header name")]
    InvalidHeaderName(String),

    #[error("default header {0:?} has a value that is not a valid HTTP header value")]
    InvalidHeaderValue(String),

    #[error("request id header name {0:?} is not a valid HTTP header name")]
    InvalidRequestIdHeader(String),

    #[error("unknown log level {0:?}")]
    UnknownLogLevel(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &FetchConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (name, value) in &config.default_headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidHeaderName(name.clone()));
        }
        if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::InvalidHeaderValue(name.clone()));
        }
    }

    if config.request_id.enabled
        && HeaderName::from_bytes(config.request_id.header_name.as_bytes()).is_err()
    {
        errors.push(ValidationError::InvalidRequestIdHeader(
            config.request_id.header_name.clone(),
        ));
    }

    if LevelFilter::from_str(&config.logging.level).is_err() {
        errors.push(ValidationError::UnknownLogLevel(config.logging.level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
