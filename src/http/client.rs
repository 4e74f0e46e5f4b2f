//! The innermost fetch: a `reqwest` client behind the `Service` contract.
//!
//! # Responsibilities
//! - Turn a [`FetchRequest`] into an outgoing HTTP request
//! - Report bad locators and transport failures as [`FetchError`]
//!
//! # Design Decisions
//! - Non-2xx statuses are responses, not errors
//! - Always ready; connection management belongs to `reqwest`

use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use tower::Service;
use url::Url;

use crate::config::schema::ClientConfig;
use crate::http::request::FetchRequest;

/// Error type for the built-in fetch.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Fetch backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct HttpFetch {
    client: reqwest::Client,
}

impl HttpFetch {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self::new(client))
    }
}

impl Service<FetchRequest> for HttpFetch {
    type Response = reqwest::Response;
    type Error = FetchError;
    type Future = BoxFuture<'static, Result<reqwest::Response, FetchError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: FetchRequest) -> Self::Future {
        let client = self.client.clone();
        Box::pin(async move {
            let (method, url, headers, body) = request.into_parts();
            let url = Url::parse(&url).map_err(|source| FetchError::InvalidUrl {
                url: url.clone(),
                source,
            })?;

            let mut builder = client.request(method, url).headers(headers);
            if let Some(body) = body {
                builder = builder.body(body);
            }

            let response = builder.send().await?;
            tracing::trace!(status = %response.status(), url = %response.url(), "fetch completed");
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_invalid_url_is_reported() {
        let error = HttpFetch::default()
            .oneshot(FetchRequest::url("not a url"))
            .await
            .unwrap_err();

        match error {
            FetchError::InvalidUrl { url, .. } => assert_eq!(url, "not a url"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_from_config_builds_client() {
        assert!(HttpFetch::from_config(&ClientConfig::default()).is_ok());
    }
}
