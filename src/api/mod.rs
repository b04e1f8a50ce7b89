//! REST client for the console API
//!
//! Every request carries the session cookie and, in anonymous mode, the
//! `X-Anonymous` header. Non-2xx answers become `ConsoleError::Http` with the
//! raw body as message so callers can pull `detailedMessage` out of it.

mod objects;
pub mod types;

use crate::config::ConsoleConfig;
use crate::errors::{ConsoleError, ConsoleResult};
use reqwest::header::{HeaderValue, CONTENT_TYPE, COOKIE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use objects::{DeleteObjectParams, ListObjectsParams};

/// Largest error body kept for messages (64 KB)
const ERROR_BODY_LIMIT: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct ConsoleClient {
    http: Client,
    base_url: String,
    session_token: Option<String>,
    anonymous: bool,
}

/// Build a query string from already-known parameters, percent-encoding the values.
pub(crate) fn query_string(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

impl ConsoleClient {
    pub fn new(
        base_url: impl Into<String>,
        session_token: Option<String>,
        anonymous: bool,
    ) -> ConsoleResult<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| ConsoleError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_token,
            anonymous,
        })
    }

    pub fn from_config(config: &ConsoleConfig) -> ConsoleResult<Self> {
        Self::new(
            config.base_url.clone(),
            config.session_token.clone(),
            config.anonymous,
        )
    }

    /// Absolute URL of an API path such as `/buckets/b/objects`
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    /// Start a request with session and anonymous headers applied.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut request = self.http.request(method, url);
        if let Some(token) = &self.session_token {
            if let Ok(value) = HeaderValue::from_str(&format!("token={}", token)) {
                request = request.header(COOKIE, value);
            }
        }
        if self.anonymous {
            request = request.header("X-Anonymous", "1");
        }
        request
    }

    pub(crate) fn json_body<B: Serialize>(
        &self,
        request: RequestBuilder,
        body: &B,
    ) -> ConsoleResult<RequestBuilder> {
        let bytes = serde_json::to_vec(body)?;
        Ok(request
            .header(CONTENT_TYPE, "application/json")
            .body(bytes))
    }

    /// Send and fail on non-2xx, keeping the body as error message.
    pub(crate) async fn send_checked(&self, request: RequestBuilder) -> ConsoleResult<Response> {
        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let message = transfer_http::read_body_text(response, ERROR_BODY_LIMIT)
            .await
            .unwrap_or_default();
        log::warn!("console api: status {} - {}", status, message);
        Err(ConsoleError::Http { status, message })
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> ConsoleResult<T> {
        let response = self.send_checked(request).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub(crate) async fn send_empty(&self, request: RequestBuilder) -> ConsoleResult<()> {
        self.send_checked(request).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_strips_trailing_slash_of_base() {
        let client = ConsoleClient::new("http://localhost:9090/console/", None, false).unwrap();
        assert_eq!(
            client.api_url("/buckets"),
            "http://localhost:9090/console/api/v1/buckets"
        );
    }

    #[test]
    fn query_string_encodes_values() {
        let qs = query_string(&[
            ("prefix", "a b/c.txt".to_string()),
            ("version_id", "v1".to_string()),
        ]);
        assert_eq!(qs, "prefix=a%20b%2Fc.txt&version_id=v1");
    }
}
