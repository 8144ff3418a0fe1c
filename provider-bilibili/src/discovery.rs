//! Random discovery support: keyword pools and the played-track cache.
//!
//! Discovery keeps a bounded memory of recently surfaced track IDs so the
//! "random" feed does not hand back the same performance twice in a row.

use std::num::NonZeroUsize;

use bridge_traits::provider::{DiscoveryRequest, GangType};
use lru::LruCache;

use crate::constants::{DEFAULT_KEYWORDS, DUO_KEYWORDS, PLAYED_CACHE_CAP, SOLO_KEYWORDS};

/// Bounded set of recently played track IDs, oldest evicted first.
pub struct PlayedCache {
    entries: LruCache<String, ()>,
}

impl Default for PlayedCache {
    fn default() -> Self {
        Self::with_capacity(PLAYED_CACHE_CAP)
    }
}

impl PlayedCache {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            entries: LruCache::new(NonZeroUsize::new(cap).expect("cache capacity is non-zero")),
        }
    }

    /// Records a track as played, evicting the oldest entry at capacity.
    pub fn insert(&mut self, track_id: &str) {
        self.entries.put(track_id.to_string(), ());
    }

    /// Membership check; does not refresh the entry's age.
    pub fn contains(&self, track_id: &str) -> bool {
        self.entries.contains(track_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves the keyword pool a discovery request draws from.
///
/// A category request uses its curated pool. An uncategorized request uses
/// the caller's custom keywords, falling back to the built-in default pool
/// when none are configured.
pub fn keyword_pool(request: &DiscoveryRequest) -> Vec<String> {
    match request.gang_type {
        Some(GangType::Solo) => SOLO_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        Some(GangType::Duo) => DUO_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        None => {
            if request.custom_keywords.is_empty() {
                DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
            } else {
                request.custom_keywords.clone()
            }
        }
    }
}
