//! HTTP transport shared by the OCSP and CRL checkers.

use crate::api::{CrlApi, OcspApi};
use crate::config::RetryConfig;
use cacop_core::{CacopError, Result};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client as HttpClient, Method};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connect timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bound on concurrent outbound requests
const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Default response body limit (16 MiB)
const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Client for OCSP responders and CRL distribution points.
///
/// Cheap to clone; clones share the connection pool and the in-flight
/// request limit.
#[derive(Clone)]
pub struct RevocationClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    timeout: Duration,
    max_body_bytes: usize,
    max_in_flight: usize,
    retry_config: RetryConfig,
    permits: Semaphore,
}

/// Body and media types of an outbound request
struct Payload<'a> {
    content_type: &'static str,
    accept: &'static str,
    body: &'a [u8],
}

impl RevocationClient {
    /// Create a client with default settings
    pub fn new() -> Result<Self> {
        RevocationClientBuilder::new().build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder() -> RevocationClientBuilder {
        RevocationClientBuilder::new()
    }

    /// Access OCSP checks
    #[must_use]
    pub fn ocsp(&self) -> OcspApi<'_> {
        OcspApi::new(self)
    }

    /// Access CRL checks
    #[must_use]
    pub fn crl(&self) -> CrlApi<'_> {
        CrlApi::new(self)
    }

    /// Maximum number of concurrent outbound requests
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight
    }

    /// Perform a GET request and return the body
    pub(crate) async fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.execute(Method::GET, url, None).await
    }

    /// Perform a POST request with a binary body
    pub(crate) async fn post(
        &self,
        url: &str,
        content_type: &'static str,
        accept: &'static str,
        body: &[u8],
    ) -> Result<Vec<u8>> {
        let payload = Payload {
            content_type,
            accept,
            body,
        };
        self.execute(Method::POST, url, Some(&payload)).await
    }

    async fn execute(&self, method: Method, url: &str, payload: Option<&Payload<'_>>) -> Result<Vec<u8>> {
        let url = parse_url(url)?;
        let retry = &self.inner.retry_config;

        let mut attempt = 0;
        loop {
            match self.send_once(method.clone(), &url, payload).await {
                Err(e) if e.is_retryable() && attempt < retry.max_retries => {
                    let backoff = retry.backoff_for(attempt);
                    warn!(url = %url, attempt, error = %e, ?backoff, "retrying request");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn send_once(&self, method: Method, url: &Url, payload: Option<&Payload<'_>>) -> Result<Vec<u8>> {
        let _permit = self
            .inner
            .permits
            .acquire()
            .await
            .map_err(|e| CacopError::Internal(e.to_string()))?;
        debug!(url = %url, %method, "request");

        let mut request = self.inner.http.request(method, url.clone());
        if let Some(payload) = payload {
            request = request
                .header(CONTENT_TYPE, payload.content_type)
                .header(ACCEPT, payload.accept)
                .body(payload.body.to_vec());
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CacopError::HttpStatus {
                url: url.to_string(),
                code: status.as_u16(),
            });
        }

        self.read_body(url, response).await
    }

    /// Read the body, refusing anything over the configured limit
    async fn read_body(&self, url: &Url, mut response: reqwest::Response) -> Result<Vec<u8>> {
        let limit = self.inner.max_body_bytes;
        let too_large = || CacopError::ResponseTooLarge {
            url: url.to_string(),
            limit,
        };

        if response
            .content_length()
            .is_some_and(|len| len > limit as u64)
        {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.transport_error(url, &e))?
        {
            if body.len() + chunk.len() > limit {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    fn transport_error(&self, url: &Url, e: &reqwest::Error) -> CacopError {
        if e.is_timeout() {
            CacopError::Timeout {
                url: url.to_string(),
                seconds: self.inner.timeout.as_secs(),
            }
        } else if e.is_connect() {
            CacopError::Connection(format!("{url}: {e}"))
        } else {
            CacopError::Http(format!("{url}: {e}"))
        }
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| CacopError::InvalidUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(CacopError::InvalidUrl(format!(
            "{raw}: unsupported scheme {other}"
        ))),
    }
}

/// Builder for configuring a [`RevocationClient`]
#[derive(Debug, Clone)]
pub struct RevocationClientBuilder {
    timeout: Duration,
    connect_timeout: Duration,
    user_agent: String,
    max_in_flight: usize,
    max_body_bytes: usize,
    retry_config: RetryConfig,
}

impl Default for RevocationClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RevocationClientBuilder {
    /// Create a new builder with default settings
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: format!("cacop/{}", env!("CARGO_PKG_VERSION")),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            retry_config: RetryConfig::default(),
        }
    }

    /// Set the per-request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Bound the number of concurrent outbound requests
    #[must_use]
    pub const fn max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max;
        self
    }

    /// Limit the size of response bodies
    #[must_use]
    pub const fn max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }

    /// Set retry configuration
    #[must_use]
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<RevocationClient> {
        if self.max_in_flight == 0 {
            return Err(CacopError::Config("max_in_flight must be at least 1".into()));
        }

        let http = HttpClient::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(&self.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| CacopError::Config(e.to_string()))?;

        Ok(RevocationClient {
            inner: Arc::new(ClientInner {
                http,
                timeout: self.timeout,
                max_body_bytes: self.max_body_bytes,
                max_in_flight: self.max_in_flight,
                retry_config: self.retry_config,
                permits: Semaphore::new(self.max_in_flight),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn rejects_zero_in_flight() {
        let err = RevocationClient::builder().max_in_flight(0).build().err().unwrap();
        assert!(matches!(err, CacopError::Config(_)));
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(matches!(
            parse_url("ldap://ldap.example.test/cn=CA?certificateRevocationList"),
            Err(CacopError::InvalidUrl(_))
        ));
        assert!(matches!(parse_url("not a url"), Err(CacopError::InvalidUrl(_))));
        assert!(parse_url("http://crl.example.test/ca.crl").is_ok());
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.crl"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = RevocationClient::new().unwrap();
        let err = client
            .get(&format!("{}/missing.crl", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, CacopError::HttpStatus { code: 404, .. }));
    }

    #[tokio::test]
    async fn oversized_body_is_refused() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 128]))
            .mount(&server)
            .await;

        let client = RevocationClient::builder().max_body_bytes(64).build().unwrap();
        let err = client.get(&server.uri()).await.unwrap_err();
        assert!(matches!(err, CacopError::ResponseTooLarge { limit: 64, .. }));
    }

    #[tokio::test]
    async fn in_flight_requests_are_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"crl".to_vec())
                    .set_delay(Duration::from_millis(300)),
            )
            .expect(6)
            .mount(&server)
            .await;

        let client = RevocationClient::builder().max_in_flight(2).build().unwrap();
        let urls: Vec<String> = (0..6).map(|i| format!("{}/{i}.crl", server.uri())).collect();

        let started = std::time::Instant::now();
        let bodies = futures_util::future::join_all(urls.iter().map(|url| client.get(url))).await;
        let elapsed = started.elapsed();

        assert_eq!(bodies.len(), 6);
        assert!(bodies.iter().all(|body| matches!(body.as_deref(), Ok(b"crl"))));
        // three waves of two
        assert!(elapsed >= Duration::from_millis(850), "finished in {elapsed:?}");
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client = RevocationClient::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        let err = client.get(&server.uri()).await.unwrap_err();
        assert!(matches!(err, CacopError::Timeout { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn retries_server_errors_when_enabled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
            .mount(&server)
            .await;

        let client = RevocationClient::builder()
            .retry(
                RetryConfig::new()
                    .max_retries(1)
                    .initial_backoff(Duration::from_millis(1)),
            )
            .build()
            .unwrap();
        assert_eq!(client.get(&server.uri()).await.unwrap(), b"ok");
    }

    #[tokio::test]
    async fn no_retry_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = RevocationClient::new().unwrap();
        let err = client.get(&server.uri()).await.unwrap_err();
        assert!(matches!(err, CacopError::HttpStatus { code: 503, .. }));
    }
}
