//! # Desktop Bridge Implementations
//!
//! Default implementations of the bridge traits for desktop platforms
//! (macOS, Windows, Linux):
//! - `HttpClient` using `reqwest` with a cookie jar and the request headers
//!   the video platform expects
//! - `SettingsStore` as a JSON file under the platform config directory
//! - `Downloader` using streamed `reqwest` transfers with progress reporting
//! - `UrlProxy` implementations for direct playback and local-proxy rewrites
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{BilibiliHttpClient, JsonSettingsStore, ReqwestDownloader};
//!
//! #[tokio::main]
//! async fn main() {
//!     let http_client = BilibiliHttpClient::new();
//!     let settings = JsonSettingsStore::open_default("crosstalk-radio").await.unwrap();
//! }
//! ```

mod download;
mod http;
mod proxy;
mod settings;

pub use download::ReqwestDownloader;
pub use http::BilibiliHttpClient;
pub use proxy::{DirectUrlProxy, LocalProxyRewrite};
pub use settings::JsonSettingsStore;
