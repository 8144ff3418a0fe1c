//! # Engine Data Models
//!
//! Playlist entries, shallow patches, and persisted favorites. A [`Track`]
//! is richer than the provider's summary: it carries the active part and the
//! resolved (possibly absent) stream source.

use bridge_traits::provider::{PartSummary, TrackDetail};
use serde::{Deserialize, Serialize};

/// One part of a multi-part release, as carried on a playlist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub part_id: String,
    pub title: String,
    pub duration_secs: u32,
}

impl From<PartSummary> for Part {
    fn from(summary: PartSummary) -> Self {
        Self {
            part_id: summary.part_id,
            title: summary.title,
            duration_secs: summary.duration_secs,
        }
    }
}

/// A playlist entry.
///
/// `audio_url` is `None` for optimistic placeholders that were inserted
/// before resolution finished; the patch that completes them arrives later
/// or, if the entry was removed in the meantime, never lands at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub thumbnail_url: String,
    pub duration_secs: u32,
    /// The part currently selected for playback.
    pub active_part_id: Option<String>,
    /// Resolved stream URL (upstream, pre-proxy).
    pub audio_url: Option<String>,
    /// Bitrate of the resolved stream; `0` means legacy/unknown.
    pub audio_bitrate_kbps: Option<u32>,
    /// Part list when the lookup reported one; `None` for search-only data.
    pub parts: Option<Vec<Part>>,
}

impl Track {
    /// Whether this entry behaves as a collection: a known part list with
    /// more than one part. `None`, `[]` and `[x]` are all single tracks.
    pub fn is_collection(&self) -> bool {
        self.parts.as_ref().map_or(false, |p| p.len() > 1)
    }

    /// Index of the active part within `parts`, when both are known.
    pub fn active_part_index(&self) -> Option<usize> {
        let active = self.active_part_id.as_deref()?;
        self.parts
            .as_ref()?
            .iter()
            .position(|p| p.part_id == active)
    }

    /// Part count, `0` when the list is unknown.
    pub fn part_count(&self) -> usize {
        self.parts.as_ref().map_or(0, |p| p.len())
    }
}

impl From<TrackDetail> for Track {
    /// Build an unresolved entry from lookup detail; the first part becomes
    /// active.
    fn from(detail: TrackDetail) -> Self {
        let active_part_id = detail
            .parts
            .first()
            .map(|p| p.part_id.clone())
            .or(detail.summary.default_part_id.clone());
        Self {
            id: detail.summary.id,
            title: detail.summary.title,
            thumbnail_url: detail.summary.thumbnail_url,
            duration_secs: detail.summary.duration_secs,
            active_part_id,
            audio_url: None,
            audio_bitrate_kbps: None,
            parts: Some(detail.parts.into_iter().map(Part::from).collect()),
        }
    }
}

/// Shallow patch applied to a playlist entry in place.
///
/// Only the fields set to `Some` change; identity fields (`id`, `title`) are
/// deliberately not patchable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackPatch {
    pub active_part_id: Option<String>,
    pub audio_url: Option<String>,
    pub audio_bitrate_kbps: Option<u32>,
}

impl TrackPatch {
    /// Patch carrying a freshly resolved source.
    pub fn resolved(url: impl Into<String>, bitrate_kbps: u32) -> Self {
        Self {
            audio_url: Some(url.into()),
            audio_bitrate_kbps: Some(bitrate_kbps),
            ..Self::default()
        }
    }

    pub fn apply(&self, track: &mut Track) {
        if let Some(part_id) = &self.active_part_id {
            track.active_part_id = Some(part_id.clone());
        }
        if let Some(url) = &self.audio_url {
            track.audio_url = Some(url.clone());
        }
        if let Some(bitrate) = self.audio_bitrate_kbps {
            track.audio_bitrate_kbps = Some(bitrate);
        }
    }
}

/// A persisted favorite.
///
/// Carries the stream URL that was current when favorited purely as display
/// metadata; replay always re-resolves, since the link will have expired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: String,
    pub title: String,
    pub thumbnail_url: String,
    pub duration_secs: u32,
    pub audio_url: Option<String>,
    /// When the favorite was added, Unix epoch milliseconds.
    pub added_at_ms: i64,
}
