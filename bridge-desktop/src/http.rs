//! HTTP Client Implementation using Reqwest
//!
//! The video platform rejects anonymous requests, so this client carries a
//! cookie jar, a browser user-agent, and the referer/origin pair on every
//! request, and primes the cookie jar with one visit to the site root before
//! the first API call.

use async_trait::async_trait;
use futures_util::StreamExt;

use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse},
};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Browser user-agent the platform accepts.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Referer/origin the platform's CDN checks.
const SITE_REFERER: &str = "https://www.bilibili.com";
const SITE_ORIGIN: &str = "https://www.bilibili.com";

/// Reqwest-based HTTP client for talking to the video platform.
///
/// Provides:
/// - Connection pooling via reqwest
/// - Cookie jar with one-time priming against the site root
/// - Referer/origin/user-agent headers on every request
/// - TLS by default
pub struct BilibiliHttpClient {
    client: Client,
    primed: OnceCell<()>,
}

impl BilibiliHttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a new HTTP client with custom timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            primed: OnceCell::new(),
        }
    }

    /// Create a client around a pre-configured reqwest instance
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            primed: OnceCell::new(),
        }
    }

    /// Visit the site root once so the jar holds the session cookies the API
    /// endpoints expect. Failure is logged and tolerated; some endpoints work
    /// without cookies.
    async fn ensure_primed(&self) {
        self.primed
            .get_or_init(|| async {
                debug!("priming cookie jar against site root");
                if let Err(e) = self
                    .client
                    .get(SITE_REFERER)
                    .header("Referer", SITE_REFERER)
                    .header("Origin", SITE_ORIGIN)
                    .send()
                    .await
                {
                    warn!(error = %e, "cookie priming request failed");
                }
            })
            .await;
    }

    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        }
    }

    /// Build a reqwest request from a bridge request, layering the platform
    /// headers under any caller-supplied ones.
    fn build_request(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let method = Self::convert_method(request.method);
        let mut req = self
            .client
            .request(method, &request.url)
            .header("Referer", SITE_REFERER)
            .header("Origin", SITE_ORIGIN);

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
}

impl Default for BilibiliHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for BilibiliHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.ensure_primed().await;

        debug!(url = %request.url, "executing HTTP request");
        let response = self
            .build_request(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BridgeError::OperationFailed("Request timed out".to_string())
                } else if e.is_connect() {
                    BridgeError::OperationFailed(format!("Connection failed: {}", e))
                } else {
                    BridgeError::OperationFailed(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn download_stream(
        &self,
        url: String,
        headers: HashMap<String, String>,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
        self.ensure_primed().await;

        let mut req = self
            .client
            .get(&url)
            .header("Referer", SITE_REFERER)
            .header("Origin", SITE_ORIGIN);
        for (key, value) in headers {
            req = req.header(key, value);
        }

        let response = req
            .send()
            .await
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BridgeError::OperationFailed(format!(
                "Download request failed with status {}",
                response.status()
            )));
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));
        Ok(Box::new(tokio_util::io::StreamReader::new(stream)))
    }
}
