//! HTTP transport implementation using reqwest.
//!
//! Provides connection pooling, TLS by default and optional retry with
//! exponential backoff on server errors and rate limiting. Callers that
//! manage their own retry budget pass [`RetryPolicy::none`].

use async_trait::async_trait;
use remote_traits::{
    error::{RemoteError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy},
};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Reqwest-based HTTP client.
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with the default 30s timeout.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a new HTTP client with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("smugsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }

    /// Wrap an externally configured reqwest client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }

    fn build_request(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let method = Self::convert_method(request.method);
        let mut req = self.client.request(method, &request.url);

        for (key, value) in request.headers {
            req = req.header(key, value);
        }

        if let Some(body) = request.body {
            req = req.body(body);
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        req
    }

    async fn execute_with_retry_internal(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt < policy.max_attempts {
            debug!(
                attempt = attempt + 1,
                max_attempts = policy.max_attempts,
                url = %request.url,
                "Executing HTTP request"
            );

            let req_builder = self.build_request(request.clone());

            match req_builder.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();

                    if status >= 500 || status == 429 {
                        warn!(
                            status = status,
                            attempt = attempt + 1,
                            "HTTP request failed with retryable status"
                        );
                        last_error = Some(RemoteError::Api {
                            status,
                            message: format!("HTTP {} error", status),
                        });
                    } else {
                        let headers: HashMap<String, String> = response
                            .headers()
                            .iter()
                            .filter_map(|(k, v)| {
                                v.to_str().ok().map(|s| (k.to_string(), s.to_string()))
                            })
                            .collect();

                        let body = response
                            .bytes()
                            .await
                            .map_err(|e| RemoteError::Network(e.to_string()))?;

                        return Ok(HttpResponse {
                            status,
                            headers,
                            body,
                        });
                    }
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        attempt = attempt + 1,
                        "HTTP request failed"
                    );

                    if e.is_timeout() {
                        last_error = Some(RemoteError::Timeout);
                    } else {
                        last_error = Some(RemoteError::Network(e.to_string()));
                    }
                }
            }

            attempt += 1;

            if attempt < policy.max_attempts {
                let delay = retry_delay(&policy, attempt);
                debug!(delay_ms = delay.as_millis(), "Retrying after delay");
                sleep(delay).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| RemoteError::Network("all retry attempts exhausted".to_string())))
    }
}

/// Delay before the next attempt, given how many attempts have completed.
fn retry_delay(policy: &RetryPolicy, completed_attempts: u32) -> Duration {
    if policy.use_exponential_backoff {
        let exponential_delay = policy.base_delay * 2u32.pow(completed_attempts - 1);
        exponential_delay.min(policy.max_delay)
    } else {
        policy.base_delay
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.execute_with_retry_internal(request, RetryPolicy::default())
            .await
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        self.execute_with_retry_internal(request, policy).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal HTTP listener answering every request with a fixed status and
    /// counting how many requests arrive on the wire.
    async fn spawn_status_server(status: u16) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let mut seen = Vec::new();
                    loop {
                        let Ok(n) = socket.read(&mut buf).await else {
                            return;
                        };
                        if n == 0 {
                            return;
                        }
                        seen.extend_from_slice(&buf[..n]);
                        if seen.windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }
                    counter.fetch_add(1, Ordering::SeqCst);
                    let response = format!(
                        "HTTP/1.1 {status} Fixed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });

        (format!("http://{addr}/"), hits)
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            use_exponential_backoff: true,
        }
    }

    #[tokio::test]
    async fn test_http_client_creation() {
        let _client = ReqwestHttpClient::new();
    }

    #[tokio::test]
    async fn test_persistent_server_error_uses_full_attempt_budget() {
        let (url, hits) = spawn_status_server(500).await;
        let client = ReqwestHttpClient::new();

        let request = HttpRequest::new(HttpMethod::Get, url);
        let result = client.execute_with_retry(request, fast_policy(3)).await;

        assert!(matches!(result, Err(RemoteError::Api { status: 500, .. })));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_none_policy_is_exactly_one_wire_attempt() {
        let (url, hits) = spawn_status_server(500).await;
        let client = ReqwestHttpClient::new();

        let request = HttpRequest::new(HttpMethod::Get, url);
        let result = client
            .execute_with_retry(request, RetryPolicy::none())
            .await;

        assert!(matches!(result, Err(RemoteError::Api { status: 500, .. })));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_client_error_status_is_returned_without_retry() {
        let (url, hits) = spawn_status_server(404).await;
        let client = ReqwestHttpClient::new();

        let request = HttpRequest::new(HttpMethod::Get, url);
        let response = client
            .execute_with_retry(request, fast_policy(3))
            .await
            .unwrap();

        // 404 is not retryable; the response surfaces to the caller as-is.
        assert_eq!(response.status, 404);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_retry_delay_grows_exponentially_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            use_exponential_backoff: true,
        };

        assert_eq!(retry_delay(&policy, 1), Duration::from_millis(100));
        assert_eq!(retry_delay(&policy, 2), Duration::from_millis(200));
        // 400ms would exceed the cap.
        assert_eq!(retry_delay(&policy, 3), Duration::from_millis(350));
        assert_eq!(retry_delay(&policy, 4), Duration::from_millis(350));
    }

    #[test]
    fn test_retry_delay_is_fixed_without_backoff() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(7),
            max_delay: Duration::from_secs(30),
            use_exponential_backoff: false,
        };

        for completed in 1..5 {
            assert_eq!(retry_delay(&policy, completed), Duration::from_millis(7));
        }
    }

    #[test]
    fn test_method_conversion() {
        assert_eq!(
            ReqwestHttpClient::convert_method(HttpMethod::Get),
            reqwest::Method::GET
        );
        assert_eq!(
            ReqwestHttpClient::convert_method(HttpMethod::Post),
            reqwest::Method::POST
        );
    }

    #[tokio::test]
    async fn test_connection_error_is_network_error() {
        // Nothing listens on this port; the connection is refused immediately.
        let client = ReqwestHttpClient::with_timeout(Duration::from_secs(2));
        let request = HttpRequest::new(HttpMethod::Get, "http://127.0.0.1:1/");
        let result = client
            .execute_with_retry(request, RetryPolicy::none())
            .await;
        assert!(matches!(result, Err(RemoteError::Network(_))));
    }
}
