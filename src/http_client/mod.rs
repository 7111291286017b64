//! HTTP client used to retrieve image bytes.

mod retry;
mod user_agent;

pub use retry::{with_retry, IsRetryable, RetryConfig};
pub use user_agent::{UserAgentPolicy, ROTATION_POOL, USER_AGENT};

use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

/// Failure to retrieve one URL.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{status} for url: {url}")]
    Status { status: StatusCode, url: String },

    #[error("{0}")]
    Network(#[from] reqwest::Error),
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            FetchError::Network(e) => e.is_timeout() || e.is_connect(),
        }
    }
}

/// Thin wrapper over `reqwest::Client` with a fixed per-request timeout.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    retry: RetryConfig,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        Self::with_user_agent(timeout, None)
    }

    /// Create a new HTTP client whose `User-Agent` follows `user_agent_config`
    /// (see [`UserAgentPolicy::parse`]).
    pub fn with_user_agent(
        timeout: Duration,
        user_agent_config: Option<&str>,
    ) -> reqwest::Result<Self> {
        let user_agent = UserAgentPolicy::parse(user_agent_config).header_value();
        debug!("Image requests identify as {}", user_agent);
        let client = Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            retry: RetryConfig::none(),
        })
    }

    /// Retry transient failures according to `retry`.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// GET `url` and return the body. Non-2xx statuses are errors.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        with_retry(&self.retry, || self.get_bytes_once(url)).await
    }

    async fn get_bytes_once(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        debug!(url, status = status.as_u16(), "Image response");

        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: url.to_string(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_bytes_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png-bytes".to_vec()))
            .mount(&server)
            .await;

        let client = HttpClient::new(Duration::from_secs(5)).unwrap();
        let body = client
            .get_bytes(&format!("{}/a.png", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, b"png-bytes");
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = HttpClient::new(Duration::from_secs(5)).unwrap();
        let err = client
            .get_bytes(&format!("{}/missing.jpg", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status, .. } if status == StatusCode::NOT_FOUND));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_retry_recovers_from_server_error() {
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

        let retry = RetryConfig {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            ..RetryConfig::default()
        };
        let client = HttpClient::new(Duration::from_secs(5))
            .unwrap()
            .with_retry(retry);
        let body = client
            .get_bytes(&format!("{}/x.jpg", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, b"ok");
    }

    #[tokio::test]
    async fn test_browser_policy_sends_session_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
            .mount(&server)
            .await;

        let client = HttpClient::with_user_agent(Duration::from_secs(5), Some("browser")).unwrap();
        client
            .get_bytes(&format!("{}/img_1.jpg", server.uri()))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let sent = requests[0].headers.get("user-agent").unwrap().to_str().unwrap();
        assert_eq!(sent, crate::browser::DESKTOP_USER_AGENT);
    }
}
