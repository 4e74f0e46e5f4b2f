//! Header collection helpers.
//!
//! # Responsibilities
//! - Merge header maps left to right (last source wins per name)
//! - Build header maps from plain string pairs (config files, CLI flags)
//!
//! # Design Decisions
//! - `http::HeaderMap` is the header collection; names are case-insensitive
//! - Merging replaces every value of a name, so multi-valued sources survive intact

use http::header::{HeaderMap, HeaderName, HeaderValue, InvalidHeaderName, InvalidHeaderValue};

/// Error raised when building a header map from strings.
#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    #[error("invalid header name {name:?}: {source}")]
    InvalidName {
        name: String,
        #[source]
        source: InvalidHeaderName,
    },

    #[error("invalid value for header {name:?}: {source}")]
    InvalidValue {
        name: String,
        #[source]
        source: InvalidHeaderValue,
    },
}

/// Copy every header of every source onto `destination`, in order.
///
/// A name present in a later source replaces whatever the destination held for
/// it, including values written by an earlier source. Names that appear in no
/// source are left alone. Returns the destination for chaining.
pub fn merge_headers<'a, I>(destination: &mut HeaderMap, sources: I) -> &mut HeaderMap
where
    I: IntoIterator<Item = &'a HeaderMap>,
{
    for source in sources {
        for name in source.keys() {
            destination.remove(name);
            for value in source.get_all(name) {
                destination.append(name.clone(), value.clone());
            }
        }
    }
    destination
}

/// Parse a header name, keeping the offending input in the error.
pub fn parse_header_name(name: &str) -> Result<HeaderName, HeaderError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|source| HeaderError::InvalidName {
        name: name.to_string(),
        source,
    })
}

/// Build a header map from `(name, value)` string pairs.
pub fn header_map<I, K, V>(pairs: I) -> Result<HeaderMap, HeaderError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let name = name.as_ref();
        let header_name = parse_header_name(name)?;
        let header_value =
            HeaderValue::from_str(value.as_ref()).map_err(|source| HeaderError::InvalidValue {
                name: name.to_string(),
                source,
            })?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}
