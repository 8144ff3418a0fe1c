//! Audio URL rewriting.
//!
//! Some hosts cannot hand a cross-origin stream URL straight to the media
//! element (webviews enforce CORS and the platform CDN rejects foreign
//! origins). Those hosts run a local relay and rewrite stream URLs through it;
//! others pass URLs through untouched. The engine calls the rewriter on every
//! resolved URL immediately before loading it and stays ignorant of which case
//! it is in.

use async_trait::async_trait;

use crate::error::Result;
use crate::platform::PlatformSendSync;

/// Rewrites a resolved stream URL into one the media element can load.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait UrlProxy: PlatformSendSync {
    async fn rewrite(&self, url: &str) -> Result<String>;
}
