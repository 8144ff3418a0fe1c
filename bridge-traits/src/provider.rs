//! Media provider contract.
//!
//! The provider turns the video platform's search and playback APIs into
//! normalized track data. The engine consumes it as an opaque async
//! collaborator; its wire format, caching and per-request retry policy are the
//! implementation's business. Provider crates implement [`MediaProvider`] the
//! way storage connectors implement a storage contract: all platform-specific
//! shape handling happens at this boundary, and everything past it works with
//! the tagged types below.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::platform::PlatformSendSync;

/// The two content categories the auto play mode cycles through:
/// solo performances and duo performances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GangType {
    Solo,
    Duo,
}

/// A track as it appears in search results: metadata only, no stream URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSummary {
    /// Platform video identifier, stable and unique within a session.
    pub id: String,
    /// Display title, already stripped of markup.
    pub title: String,
    /// Cover image URL, already normalized to https.
    pub thumbnail_url: String,
    /// Total duration in seconds; `0` means unknown.
    pub duration_secs: u32,
    /// Identifier of the default playable part, when the lookup endpoint
    /// reported one. Search results usually omit it.
    pub default_part_id: Option<String>,
}

/// One part of a multi-part release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSummary {
    /// Stream identifier used to resolve this part's audio.
    pub part_id: String,
    /// Part title.
    pub title: String,
    /// Part duration in seconds; `0` means unknown.
    pub duration_secs: u32,
}

/// Full track detail from the lookup endpoint.
///
/// `parts` always reflects what the platform reported; whether the track
/// behaves as a collection (more than one part) is the engine's call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDetail {
    pub summary: TrackSummary,
    pub parts: Vec<PartSummary>,
}

/// One audio rendition of a (track, part) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendition {
    /// Signed, time-limited stream URL.
    pub url: String,
    /// Average bitrate in kbps.
    pub bitrate_kbps: u32,
}

/// What the playback endpoint returned for a (track, part) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioRenditions {
    /// Renditions ranked by bitrate, descending. May be empty.
    Ranked(Vec<Rendition>),
    /// Legacy single-URL stream with no bitrate metadata.
    Legacy { url: String },
}

impl AudioRenditions {
    /// Returns `true` when there is nothing playable at all.
    pub fn is_empty(&self) -> bool {
        match self {
            AudioRenditions::Ranked(list) => list.is_empty(),
            AudioRenditions::Legacy { .. } => false,
        }
    }
}

/// Parameters for random content discovery (the "infinite radio" feed).
#[derive(Debug, Clone, Default)]
pub struct DiscoveryRequest {
    /// Restrict discovery to one content category; `None` draws from the
    /// caller's keyword pool instead.
    pub gang_type: Option<GangType>,
    /// User-configured keywords, used when `gang_type` is `None`. An empty
    /// list falls back to the provider's built-in pool.
    pub custom_keywords: Vec<String>,
}

/// Search, lookup and stream-URL resolution against the video platform.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait MediaProvider: PlatformSendSync {
    /// Keyword search, one page of ranked results.
    async fn search(&self, keyword: &str, page: u32) -> Result<Vec<TrackSummary>>;

    /// Full detail for one track, including its part list.
    async fn track_detail(&self, track_id: &str) -> Result<TrackDetail>;

    /// The ranked audio renditions for a (track, part) pair.
    async fn audio_renditions(&self, track_id: &str, part_id: &str) -> Result<AudioRenditions>;

    /// Pick a random not-recently-played track matching the request.
    ///
    /// Returns `Ok(None)` when nothing suitable was found; that is an empty
    /// result, not an error.
    async fn discover(&self, request: DiscoveryRequest) -> Result<Option<TrackDetail>>;
}
