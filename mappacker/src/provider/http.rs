//! HTTP client abstraction for testability

use super::types::ProviderError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::borrow::Cow;
use std::future::Future;
use tracing::{debug, trace, warn};

/// Trait for asynchronous HTTP client operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an async HTTP GET request.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    ///
    /// # Returns
    ///
    /// The response body as bytes or an error.
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send;

    /// Performs an async HTTP GET request with custom headers.
    ///
    /// Partial-content responses (`206`) to `Range` requests count as success.
    fn get_with_headers(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send;

    /// Performs an async HTTP GET request with Bearer token authentication.
    fn get_with_bearer(
        &self,
        url: &str,
        bearer_token: &str,
    ) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send {
        let header = format!("Bearer {}", bearer_token);
        async move {
            self.get_with_headers(url, &[("Authorization", header.as_str())])
                .await
        }
    }

    /// Performs an async HTTP GET request with Basic authentication.
    fn get_with_basic_auth(
        &self,
        url: &str,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send {
        let header = basic_auth_header(username, password);
        async move {
            self.get_with_headers(url, &[("Authorization", header.as_str())])
                .await
        }
    }
}

/// Builds an `Authorization: Basic` header value.
pub fn basic_auth_header(username: &str, password: &str) -> String {
    format!(
        "Basic {}",
        BASE64.encode(format!("{}:{}", username, password))
    )
}

/// Query parameters whose values are credentials.
const SECRET_PARAMS: &[&str] = &["access_token", "key", "api_key", "token"];

/// Masks credential query parameters so the URL can be logged or reported.
pub fn redact_url(url: &str) -> Cow<'_, str> {
    let Some((base, query)) = url.split_once('?') else {
        return Cow::Borrowed(url);
    };
    let is_secret = |pair: &str| {
        let name = pair.split_once('=').map_or(pair, |(name, _)| name);
        SECRET_PARAMS.contains(&name)
    };
    if !query.split('&').any(is_secret) {
        return Cow::Borrowed(url);
    }

    let query: Vec<Cow<'_, str>> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, _)) if is_secret(pair) => Cow::Owned(format!("{}=REDACTED", name)),
            _ => Cow::Borrowed(pair),
        })
        .collect();
    Cow::Owned(format!("{}?{}", base, query.join("&")))
}

/// Default User-Agent string for HTTP requests.
/// Required by some tile servers (e.g., Google) that reject requests without a User-Agent.
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Async HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
}

impl AsyncReqwestClient {
    /// Creates a new AsyncReqwestClient with default configuration.
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a new AsyncReqwestClient with custom timeout.
    ///
    /// Keeps a modest idle pool per host since acquisition fans out to a
    /// handful of concurrent requests against one tile server.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent(DEFAULT_USER_AGENT)
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| {
                ProviderError::HttpError(format!("Failed to create async HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> Result<Vec<u8>, ProviderError> {
        let url = redact_url(url);
        trace!(url = %url, "HTTP GET request starting");

        let response = match request.send().await {
            Ok(resp) => {
                debug!(
                    url = %url,
                    status = resp.status().as_u16(),
                    "HTTP response received"
                );
                resp
            }
            Err(e) => {
                // reqwest's error text embeds the full request URL
                let e = e.without_url();
                warn!(
                    url = %url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(ProviderError::HttpError(format!("Request failed: {}", e)));
            }
        };

        // Check HTTP status (2xx includes 206 Partial Content)
        if !response.status().is_success() {
            debug!(
                url = %url,
                status = response.status().as_u16(),
                "HTTP error status"
            );
            return Err(ProviderError::HttpError(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        match response.bytes().await {
            Ok(bytes) => {
                trace!(url = %url, bytes = bytes.len(), "HTTP response body read");
                Ok(bytes.to_vec())
            }
            Err(e) => {
                let e = e.without_url();
                warn!(url = %url, error = %e, "Failed to read response body");
                Err(ProviderError::HttpError(format!(
                    "Failed to read response: {}",
                    e
                )))
            }
        }
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        self.send(self.client.get(url), url).await
    }

    async fn get_with_headers(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<Vec<u8>, ProviderError> {
        let mut request = self.client.get(url);

        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        self.send(request, url).await
    }
}

impl<C: AsyncHttpClient> AsyncHttpClient for std::sync::Arc<C> {
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send {
        (**self).get(url)
    }

    fn get_with_headers(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send {
        (**self).get_with_headers(url, headers)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock async HTTP client for testing.
    ///
    /// Returns the same response for every request and records each URL
    /// together with its headers.
    #[derive(Clone)]
    pub struct MockAsyncHttpClient {
        pub response: Result<Vec<u8>, ProviderError>,
        pub requests: Arc<Mutex<Vec<(String, Vec<(String, String)>)>>>,
    }

    impl MockAsyncHttpClient {
        pub fn ok(body: Vec<u8>) -> Self {
            Self {
                response: Ok(body),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn err(message: &str) -> Self {
            Self {
                response: Err(ProviderError::HttpError(message.to_string())),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn urls(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|(url, _)| url.clone())
                .collect()
        }

        pub fn last_headers(&self) -> Vec<(String, String)> {
            self.requests
                .lock()
                .unwrap()
                .last()
                .map(|(_, headers)| headers.clone())
                .unwrap_or_default()
        }
    }

    impl AsyncHttpClient for MockAsyncHttpClient {
        async fn get(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
            self.get_with_headers(url, &[]).await
        }

        async fn get_with_headers(
            &self,
            url: &str,
            headers: &[(&str, &str)],
        ) -> Result<Vec<u8>, ProviderError> {
            self.requests.lock().unwrap().push((
                url.to_string(),
                headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ));
            self.response.clone()
        }
    }

    #[tokio::test]
    async fn test_mock_async_client_success() {
        let mock = MockAsyncHttpClient::ok(vec![1, 2, 3, 4]);

        let result = mock.get("http://example.com").await;
        assert_eq!(result.unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(mock.urls(), vec!["http://example.com".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_async_client_error() {
        let mock = MockAsyncHttpClient::err("Test error");

        let result = mock.get("http://example.com").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_bearer_header() {
        let mock = MockAsyncHttpClient::ok(vec![]);
        mock.get_with_bearer("http://example.com", "abc").await.unwrap();
        assert_eq!(
            mock.last_headers(),
            vec![("Authorization".to_string(), "Bearer abc".to_string())]
        );
    }

    #[tokio::test]
    async fn test_basic_auth_with_empty_password() {
        let mock = MockAsyncHttpClient::ok(vec![]);
        mock.get_with_basic_auth("http://example.com", "key", "")
            .await
            .unwrap();
        // base64("key:")
        assert_eq!(
            mock.last_headers(),
            vec![("Authorization".to_string(), "Basic a2V5Og==".to_string())]
        );
    }

    #[test]
    fn test_redact_url_masks_credentials() {
        assert_eq!(
            redact_url("https://api.mapbox.com/v4/a/1/2/3.jpg?access_token=pk.secret"),
            "https://api.mapbox.com/v4/a/1/2/3.jpg?access_token=REDACTED"
        );
        assert_eq!(
            redact_url("https://x/t.mvt?lang=en&key=s3cret&v=2"),
            "https://x/t.mvt?lang=en&key=REDACTED&v=2"
        );
        assert!(!redact_url("https://x/?token=abc").contains("abc"));
        assert!(matches!(redact_url("https://x/1/2/3"), Cow::Borrowed(_)));
        assert!(matches!(redact_url("https://x/?lyrs=s"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_basic_auth_header_encoding() {
        assert_eq!(basic_auth_header("user", "pass"), "Basic dXNlcjpwYXNz");
    }
}
