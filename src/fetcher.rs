//! # Stats Fetching
//!
//! The [`StatsFetcher`] trait is the seam between the cache manager and the remote
//! statistics service. [`HttpStatsFetcher`] is the production implementation; tests
//! substitute counting or failing fetchers.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dioxus_stats_dashboard::fetcher::{HttpStatsFetcher, StatsFetcher};
//!
//! # async fn demo() {
//! let fetcher = HttpStatsFetcher::new("https://example.com/api/analytics/stats");
//! let snapshot = fetcher.fetch(Some("token".to_string())).await;
//! # }
//! ```

use std::{future::Future, time::Duration};

use futures::future::{Either, select};
use reqwest::{Client, header::CONTENT_TYPE};
use tracing::{debug, warn};

use crate::{
    config::DashboardConfig,
    errors::{FetchError, FetchResult},
    platform::{MaybeSend, MaybeSync, sleep},
    types::MetricSnapshot,
};

/// Something that can produce a fresh [`MetricSnapshot`]
///
/// The returned future must be `Send` natively; on the web it may hold browser
/// handles and is polled on the page's only thread.
pub trait StatsFetcher: MaybeSend + MaybeSync + 'static {
    /// Fetch one snapshot, authenticating with `token` when present
    fn fetch(
        &self,
        token: Option<String>,
    ) -> impl Future<Output = FetchResult<MetricSnapshot>> + MaybeSend;
}

/// Fetches snapshots from the analytics HTTP endpoint
#[derive(Clone, Debug)]
pub struct HttpStatsFetcher {
    client: Client,
    endpoint: String,
    timeout: Option<Duration>,
}

impl HttpStatsFetcher {
    /// Create a fetcher for `endpoint` with no request timeout
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            timeout: None,
        }
    }

    /// Create a fetcher from the endpoint and timeout in `config`
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(config.endpoint.clone()).with_timeout(config.fetch_timeout)
    }

    /// Reuse an existing client (connection pool, proxies, TLS settings)
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Bound each request, body included, by `timeout`. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request(&self, token: Option<String>) -> FetchResult<MetricSnapshot> {
        let mut request = self
            .client
            .get(&self.endpoint)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        debug!("🌐 [STATS-FETCH] GET {}", self.endpoint);
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("Unknown status")
                    .to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        serde_json::from_str::<MetricSnapshot>(&body)
            .map_err(|e| FetchError::Parse(e.to_string()))
    }
}

impl StatsFetcher for HttpStatsFetcher {
    async fn fetch(&self, token: Option<String>) -> FetchResult<MetricSnapshot> {
        let Some(timeout) = self.timeout else {
            return self.request(token).await;
        };

        // Raced against the platform timer so the bound holds on the web too.
        let request = self.request(token);
        let deadline = sleep(timeout);
        futures::pin_mut!(request, deadline);
        match select(request, deadline).await {
            Either::Left((result, _)) => result,
            Either::Right(((), _)) => {
                warn!(
                    "⏱️ [STATS-FETCH] GET {} timed out after {:?}",
                    self.endpoint, timeout
                );
                Err(FetchError::Timeout(timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        sync::oneshot,
    };

    /// Serve one canned HTTP response and hand back the raw request
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buffer = vec![0u8; 4096];
            let read = socket.read(&mut buffer).await.unwrap();
            let _ = tx.send(String::from_utf8_lossy(&buffer[..read]).to_string());

            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        (format!("http://{address}/api/analytics/stats"), rx)
    }

    #[tokio::test]
    async fn test_fetch_parses_snapshot_and_sends_bearer_token() {
        let (endpoint, request) = serve_once(
            "200 OK",
            r#"{"total_users":1200,"total_providers":34,"total_active_providers":29,"total_queries_processed":58210}"#,
        )
        .await;

        let fetcher = HttpStatsFetcher::new(endpoint);
        let snapshot = fetcher.fetch(Some("secret-token".to_string())).await.unwrap();
        assert_eq!(snapshot, MetricSnapshot::new(1200, 34, 29, 58210));

        let raw = request.await.unwrap().to_lowercase();
        assert!(raw.starts_with("get /api/analytics/stats"));
        assert!(raw.contains("authorization: bearer secret-token"));
        assert!(raw.contains("content-type: application/json"));
    }

    #[tokio::test]
    async fn test_fetch_without_token_omits_authorization() {
        let (endpoint, request) = serve_once(
            "200 OK",
            r#"{"total_users":1,"total_providers":2,"total_active_providers":3,"total_queries_processed":4}"#,
        )
        .await;

        HttpStatsFetcher::new(endpoint).fetch(None).await.unwrap();
        let raw = request.await.unwrap().to_lowercase();
        assert!(!raw.contains("authorization"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_http_error() {
        let (endpoint, _request) = serve_once("500 Internal Server Error", "{}").await;

        let error = HttpStatsFetcher::new(endpoint).fetch(None).await.unwrap_err();
        assert_eq!(
            error,
            FetchError::HttpStatus {
                status: 500,
                message: "Internal Server Error".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let (endpoint, _request) = serve_once("200 OK", r#"{"total_users":"many"}"#).await;

        let error = HttpStatsFetcher::new(endpoint).fetch(None).await.unwrap_err();
        assert!(matches!(error, FetchError::Parse(_)));
    }

    #[tokio::test]
    async fn test_silent_server_hits_configured_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and hold the connection without answering.
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let timeout = Duration::from_millis(200);
        let error = HttpStatsFetcher::new(format!("http://{address}/stats"))
            .with_timeout(Some(timeout))
            .fetch(None)
            .await
            .unwrap_err();
        assert_eq!(error, FetchError::Timeout(timeout));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let error = HttpStatsFetcher::new(format!("http://{address}/stats"))
            .fetch(None)
            .await
            .unwrap_err();
        assert!(matches!(error, FetchError::Network(_)));
    }
}
