//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback engine and its
//! platform-specific collaborators. Each trait represents a capability that the
//! core requires but that must be implemented differently per platform
//! (desktop, Android, web).
//!
//! ## Traits
//!
//! ### Networking & Content
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations with TLS and streaming
//! - [`MediaProvider`](provider::MediaProvider) - Search, track detail and
//!   stream-URL resolution against the video platform
//! - [`UrlProxy`](proxy::UrlProxy) - Audio URL rewriting for hosts that need a
//!   CORS shim in front of the media element
//!
//! ### Playback
//! - [`MediaElement`](media::MediaElement) - The single playable element the
//!   host owns; the transport drives it and consumes its event stream
//!
//! ### Persistence & I/O
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//! - [`Downloader`](download::Downloader) - Byte transfer to disk with a
//!   progress stream
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`PlatformProfile`](platform::PlatformProfile) - Capability flags that
//!   select engine strategies at construction time
//!
//! ## Fail-Fast Strategy
//!
//! The engine does not probe for capabilities at call time; every collaborator
//! is injected at construction and a missing one is a wiring bug, not a
//! runtime condition.
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Platform implementations should convert platform-specific errors to
//! `BridgeError` and provide actionable messages.
//!
//! ## Thread Safety
//!
//! On native targets all bridge traits require `Send + Sync` so adapters can
//! be shared freely across async tasks; the bounds become no-ops on `wasm32`
//! via the markers in [`platform`].

pub mod download;
pub mod error;
pub mod http;
pub mod media;
pub mod platform;
pub mod provider;
pub mod proxy;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use download::{DownloadKind, DownloadProgress, DownloadRequest, Downloader};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use media::{MediaElement, MediaElementEvent};
pub use platform::{PlatformProfile, PlatformSend, PlatformSendSync};
pub use provider::{
    AudioRenditions, DiscoveryRequest, GangType, MediaProvider, PartSummary, Rendition,
    TrackDetail, TrackSummary,
};
pub use proxy::UrlProxy;
pub use storage::SettingsStore;
pub use time::{Clock, SystemClock};
