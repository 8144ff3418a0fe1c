//! # Track Resolver
//!
//! Turns a (track, part, quality) triple into a playable stream URL. The
//! provider hands back renditions ranked by bitrate; the resolver applies the
//! quality preference and caches winners, keyed by upstream URL so recovery
//! can surgically invalidate an expired link.

use std::num::NonZeroUsize;
use std::sync::Arc;

use bridge_traits::provider::{AudioRenditions, MediaProvider, Rendition};
use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, instrument};

use crate::error::{PlayerError, Result};
use crate::settings::AudioQuality;

/// How many resolved sources the cache keeps.
const SOURCE_CACHE_CAP: usize = 10;

/// A resolved, playable stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    /// Signed upstream URL (pre-proxy).
    pub url: String,
    /// Bitrate in kbps; `0` for legacy streams with no metadata.
    pub bitrate_kbps: u32,
}

/// Pick one rendition from a bitrate-descending list.
///
/// High takes the first, Low the last, Medium the floor midpoint. A
/// single-element list satisfies every preference.
fn pick_rendition(ranked: &[Rendition], quality: AudioQuality) -> Option<&Rendition> {
    if ranked.is_empty() {
        return None;
    }
    let index = match quality {
        AudioQuality::High => 0,
        AudioQuality::Medium => ranked.len() / 2,
        AudioQuality::Low => ranked.len() - 1,
    };
    ranked.get(index.min(ranked.len() - 1))
}

/// Quality-aware stream resolution with a small LRU source cache.
pub struct TrackResolver {
    provider: Arc<dyn MediaProvider>,
    /// Keyed by upstream URL; the value is the full resolved source so a
    /// cache hit round-trips without touching the provider.
    cache: Mutex<LruCache<String, ResolvedSource>>,
}

impl TrackResolver {
    pub fn new(provider: Arc<dyn MediaProvider>) -> Self {
        Self {
            provider,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(SOURCE_CACHE_CAP).expect("cache capacity is non-zero"),
            )),
        }
    }

    /// Resolve the stream for a (track, part) pair at the given quality.
    ///
    /// Always queries the provider; the cache exists so recovery can check
    /// whether a failing URL was one of ours before invalidating.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        track_id: &str,
        part_id: &str,
        quality: AudioQuality,
    ) -> Result<ResolvedSource> {
        let renditions = self.provider.audio_renditions(track_id, part_id).await?;

        let source = match renditions {
            AudioRenditions::Ranked(ranked) => pick_rendition(&ranked, quality)
                .map(|r| ResolvedSource {
                    url: r.url.clone(),
                    bitrate_kbps: r.bitrate_kbps,
                })
                .ok_or_else(|| PlayerError::NoPlayableSource {
                    track_id: track_id.to_string(),
                })?,
            AudioRenditions::Legacy { url } => ResolvedSource {
                url,
                bitrate_kbps: 0,
            },
        };

        debug!(url = %source.url, bitrate = source.bitrate_kbps, "resolved stream source");
        self.cache
            .lock()
            .put(source.url.clone(), source.clone());
        Ok(source)
    }

    /// Drop a cached source by its upstream URL. Recovery calls this before
    /// re-resolving so the dead link cannot be served again.
    pub fn invalidate(&self, url: &str) {
        if self.cache.lock().pop(url).is_some() {
            debug!(url, "invalidated cached stream source");
        }
    }

    /// Whether a URL is currently cached (diagnostics and tests).
    pub fn is_cached(&self, url: &str) -> bool {
        self.cache.lock().contains(url)
    }
}
