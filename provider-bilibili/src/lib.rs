//! # Bilibili Provider
//!
//! Implements the [`MediaProvider`](bridge_traits::provider::MediaProvider)
//! contract against the Bilibili web API: keyword search, track lookup with
//! multi-part detail, DASH/legacy audio stream resolution, and random
//! discovery over curated crosstalk keyword pools.
//!
//! All requests go through an injected
//! [`HttpClient`](bridge_traits::http::HttpClient); the host's client is
//! responsible for the referer, user-agent and cookie handshake the API
//! expects.

pub mod connector;
pub mod constants;
pub mod discovery;
pub mod error;
pub mod types;

pub use connector::BilibiliConnector;
pub use error::{BilibiliError, Result};
