//! Stream URL proxy implementations
//!
//! The video platform's CDN checks the referer header, which webview hosts
//! cannot attach to media element requests. Such hosts run a local relay and
//! rewrite stream URLs to pass through it; native hosts play the CDN URL
//! directly.

use async_trait::async_trait;
use bridge_traits::{error::Result, proxy::UrlProxy};

/// Identity proxy for hosts whose media element can reach the CDN directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectUrlProxy;

#[async_trait]
impl UrlProxy for DirectUrlProxy {
    async fn rewrite(&self, url: &str) -> Result<String> {
        Ok(url.to_string())
    }
}

/// Rewrites stream URLs to go through a local relay server.
///
/// The relay is expected to serve `GET {base}/proxy/{percent-encoded-url}`,
/// forwarding the request with the headers the CDN requires.
#[derive(Debug, Clone)]
pub struct LocalProxyRewrite {
    base: String,
}

impl LocalProxyRewrite {
    /// `base` is the relay's root, e.g. `http://127.0.0.1:8457`.
    pub fn new(base: impl Into<String>) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        Self { base }
    }
}

#[async_trait]
impl UrlProxy for LocalProxyRewrite {
    async fn rewrite(&self, url: &str) -> Result<String> {
        Ok(format!("{}/proxy/{}", self.base, urlencoding::encode(url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn direct_proxy_is_identity() {
        let url = "https://cdn.example.com/audio.m4a?sign=abc";
        assert_eq!(DirectUrlProxy.rewrite(url).await.unwrap(), url);
    }

    #[tokio::test]
    async fn local_proxy_encodes_url() {
        let proxy = LocalProxyRewrite::new("http://127.0.0.1:8457/");
        let rewritten = proxy
            .rewrite("https://cdn.example.com/a.m4a?sign=x&y=1")
            .await
            .unwrap();
        assert_eq!(
            rewritten,
            "http://127.0.0.1:8457/proxy/https%3A%2F%2Fcdn.example.com%2Fa.m4a%3Fsign%3Dx%26y%3D1"
        );
    }
}
