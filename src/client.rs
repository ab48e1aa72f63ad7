//! HTTP client with timeout and retry policy.
//!
//! This module executes built URLs against the reporting API. Timeouts and
//! HTTP 500/502/503 are retried with linear backoff; every other failure is
//! returned to the caller on the first attempt.

use crate::config::{ClientConfig, Config};
use crate::error::{MetrikaError, Result};
use crate::operations;
use crate::query::{BuiltUrl, QueryBuilder, ReportRequest};
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, trace, warn};

/// Statuses worth another attempt.
const RETRYABLE_STATUSES: [StatusCode; 3] = [
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
];

/// Client for the reporting API.
///
/// Holds no per-call state; clones share the connection pool and config.
#[derive(Debug, Clone)]
pub struct MetrikaClient {
    http: Client,
    config: Arc<ClientConfig>,
    builder: QueryBuilder,
}

impl MetrikaClient {
    /// Create a new client.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let mut auth = header::HeaderValue::from_str(&format!("OAuth {}", config.token))
            .map_err(|_| MetrikaError::InvalidConfig("token contains invalid characters".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);

        let http = Client::builder()
            .timeout(config.client.timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            http,
            config: Arc::new(config.client.clone()),
            builder: QueryBuilder::new(&config.base_url)?,
        })
    }

    /// The query builder bound to this client's origin.
    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    /// Transport settings.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Dispatch a named operation with raw JSON parameters.
    pub async fn call(&self, operation: &str, params: Value) -> Result<Value> {
        let request = operations::lookup(operation)?.parse(params)?;
        self.report(&request).await
    }

    /// Build and execute a typed report request.
    pub async fn report(&self, request: &ReportRequest) -> Result<Value> {
        let url = self.builder.build(request)?;
        self.fetch(&url).await
    }

    /// Execute a built URL with retries.
    ///
    /// The same URL is reused on every attempt. When attempts run out, the
    /// last observed error is returned.
    pub async fn fetch(&self, url: &BuiltUrl) -> Result<Value> {
        let retries = self.config.retries.max(1);
        let mut last_error = None;

        for attempt in 1..=retries {
            match self.send_once(url).await {
                Ok(body) => return Ok(body),
                Err(error) if error.is_retryable() => {
                    if attempt < retries {
                        let backoff = self.backoff(attempt);
                        debug!(
                            attempt,
                            max_attempts = retries,
                            backoff_ms = backoff.as_millis() as u64,
                            error = %error,
                            "Request failed, retrying"
                        );
                        sleep(backoff).await;
                    } else {
                        warn!(attempts = attempt, error = %error, "Retries exhausted");
                    }
                    last_error = Some(error);
                }
                Err(error) => {
                    warn!(attempt, status = ?error.status(), error = %error, "Non-retryable error");
                    return Err(error);
                }
            }
        }

        Err(last_error.unwrap_or(MetrikaError::Timeout {
            timeout: self.config.timeout,
        }))
    }

    /// Send a single request without retries.
    async fn send_once(&self, url: &BuiltUrl) -> Result<Value> {
        trace!(url = %url, "Sending request");

        let response = self
            .http
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();

        if status.is_success() {
            let text = response.text().await.map_err(|e| self.classify(e))?;
            return serde_json::from_str(&text).map_err(|e| MetrikaError::InvalidResponse {
                message: format!("response body is not JSON: {e}"),
            });
        }

        let body = error_body(status, response.text().await);
        if RETRYABLE_STATUSES.contains(&status) {
            Err(MetrikaError::ServiceUnavailable {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(MetrikaError::RequestFailed {
                status: status.as_u16(),
                body,
            })
        }
    }

    fn classify(&self, error: reqwest::Error) -> MetrikaError {
        if error.is_timeout() {
            MetrikaError::Timeout {
                timeout: self.config.timeout,
            }
        } else {
            MetrikaError::Transport(error)
        }
    }

    /// Linear backoff before the attempt after `attempt`.
    fn backoff(&self, attempt: u32) -> Duration {
        self.config.retry_delay * attempt
    }
}

/// Body of an error response. An unreadable body is logged and left empty.
fn error_body(status: StatusCode, body: reqwest::Result<String>) -> String {
    body.unwrap_or_else(|e| {
        warn!(status = status.as_u16(), error = %e, "Failed to read error response body");
        String::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Instant;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn test_config(base_url: &str) -> Config {
        Config {
            token: "test-token".to_string(),
            base_url: base_url.to_string(),
            client: ClientConfig {
                timeout: Duration::from_millis(500),
                retries: 3,
                retry_delay: Duration::from_millis(20),
            },
        }
    }

    fn client(server: &MockServer) -> MetrikaClient {
        MetrikaClient::new(&test_config(&server.uri())).unwrap()
    }

    fn summary() -> ReportRequest {
        ReportRequest::SourcesSummary(crate::params::DateRangeParams::new("42"))
    }

    #[test]
    fn test_backoff_is_linear() {
        let client = MetrikaClient::new(&test_config("http://localhost:8080")).unwrap();

        assert_eq!(client.backoff(1), Duration::from_millis(20));
        assert_eq!(client.backoff(2), Duration::from_millis(40));
        assert_eq!(client.backoff(3), Duration::from_millis(60));
    }

    #[test]
    fn test_requires_token() {
        let mut config = test_config("http://localhost:8080");
        config.token = String::new();
        assert!(matches!(
            MetrikaClient::new(&config),
            Err(MetrikaError::MissingToken)
        ));
    }

    #[test]
    fn test_rejects_zero_retries() {
        let mut config = test_config("http://localhost:8080");
        config.client.retries = 0;
        assert!(MetrikaClient::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_success_sends_auth_and_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stat/v1/data"))
            .and(query_param("ids", "42"))
            .and(query_param("preset", "sources_summary"))
            .and(header("authorization", "OAuth test-token"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"total_rows": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let body = client(&server).report(&summary()).await.unwrap();
        assert_eq!(body["total_rows"], 1);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let server = MockServer::start().await;
        let arrivals = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&arrivals);
        Mock::given(method("GET"))
            .respond_with(move |_: &Request| {
                let mut times = log.lock().unwrap();
                times.push(Instant::now());
                if times.len() < 3 {
                    ResponseTemplate::new(503).set_body_string("busy")
                } else {
                    ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true}))
                }
            })
            .expect(3)
            .mount(&server)
            .await;

        let mut config = test_config(&server.uri());
        config.client.retry_delay = Duration::from_millis(50);
        let body = MetrikaClient::new(&config)
            .unwrap()
            .report(&summary())
            .await
            .unwrap();
        assert_eq!(body["ok"], true);

        let times = arrivals.lock().unwrap();
        assert_eq!(times.len(), 3);
        // 50ms after the first attempt, 100ms after the second.
        assert!(times[1] - times[0] >= Duration::from_millis(50));
        assert!(times[2] - times[1] >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_unreadable_error_body_is_empty() {
        // Nothing listens on port 1, so the send fails.
        let err = Client::new()
            .get("http://127.0.0.1:1/")
            .send()
            .await
            .unwrap_err();

        assert_eq!(error_body(StatusCode::SERVICE_UNAVAILABLE, Err(err)), "");
        assert_eq!(
            error_body(StatusCode::SERVICE_UNAVAILABLE, Ok("busy".to_string())),
            "busy"
        );
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("still busy"))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server).report(&summary()).await.unwrap_err();
        match err {
            MetrikaError::ServiceUnavailable { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "still busy");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"message":"counter not found"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).report(&summary()).await.unwrap_err();
        assert!(matches!(
            err,
            MetrikaError::RequestFailed { status: 404, ref body } if body.contains("counter not found")
        ));
    }

    #[tokio::test]
    async fn test_other_5xx_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(504))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).report(&summary()).await.unwrap_err();
        assert!(matches!(err, MetrikaError::RequestFailed { status: 504, .. }));
    }

    #[tokio::test]
    async fn test_timeout_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(2_000)))
            .expect(2)
            .mount(&server)
            .await;

        let mut config = test_config(&server.uri());
        config.client.timeout = Duration::from_millis(100);
        config.client.retries = 2;
        let client = MetrikaClient::new(&config).unwrap();

        let err = client.report(&summary()).await.unwrap_err();
        assert!(matches!(err, MetrikaError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_invalid_parameter_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server)
            .call("get_sources_summary", serde_json::json!({ "counter_id": "" }))
            .await
            .unwrap_err();
        assert!(matches!(err, MetrikaError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn test_non_json_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server).report(&summary()).await.unwrap_err();
        assert!(matches!(err, MetrikaError::InvalidResponse { .. }));
    }
}
