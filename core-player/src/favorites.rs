//! # Favorites
//!
//! Persisted favorite tracks, stored as one JSON list under a single
//! settings key. The stream URL captured at favoriting time is metadata
//! only; replaying a favorite re-resolves through the normal path because
//! stored links expire.

use std::sync::Arc;

use bridge_traits::storage::SettingsStore;
use bridge_traits::time::Clock;
use tracing::debug;

use crate::error::{PlayerError, Result};
use crate::models::{Favorite, Track};

const FAVORITES_KEY: &str = "favorites";

/// Favorites persistence over the injected settings store.
pub struct FavoritesService {
    store: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
}

impl FavoritesService {
    pub fn new(store: Arc<dyn SettingsStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// All favorites in insertion order.
    pub async fn list(&self) -> Result<Vec<Favorite>> {
        let Some(raw) = self.store.get_string(FAVORITES_KEY).await? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw)
            .map_err(|e| PlayerError::Persistence(format!("favorites list is corrupt: {}", e)))
    }

    pub async fn is_favorite(&self, track_id: &str) -> Result<bool> {
        Ok(self.list().await?.iter().any(|f| f.id == track_id))
    }

    /// Add the track if absent, remove it if present. Returns `true` when
    /// the track is a favorite after the call.
    pub async fn toggle(&self, track: &Track) -> Result<bool> {
        let mut favorites = self.list().await?;

        if let Some(pos) = favorites.iter().position(|f| f.id == track.id) {
            favorites.remove(pos);
            self.persist(&favorites).await?;
            debug!(track_id = %track.id, "favorite removed");
            return Ok(false);
        }

        favorites.push(Favorite {
            id: track.id.clone(),
            title: track.title.clone(),
            thumbnail_url: track.thumbnail_url.clone(),
            duration_secs: track.duration_secs,
            audio_url: track.audio_url.clone(),
            added_at_ms: self.clock.now_millis(),
        });
        self.persist(&favorites).await?;
        debug!(track_id = %track.id, "favorite added");
        Ok(true)
    }

    async fn persist(&self, favorites: &[Favorite]) -> Result<()> {
        let json = serde_json::to_string(favorites)
            .map_err(|e| PlayerError::Persistence(e.to_string()))?;
        self.store.set_string(FAVORITES_KEY, &json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// In-memory settings store for tests.
    struct MemoryStore {
        values: Mutex<HashMap<String, String>>,
    }

    impl MemoryStore {
        fn new() -> Self {
            Self {
                values: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl SettingsStore for MemoryStore {
        async fn set_string(&self, key: &str, value: &str) -> bridge_traits::error::Result<()> {
            self.values.lock().insert(key.into(), value.into());
            Ok(())
        }
        async fn get_string(&self, key: &str) -> bridge_traits::error::Result<Option<String>> {
            Ok(self.values.lock().get(key).cloned())
        }
        async fn set_bool(&self, _key: &str, _value: bool) -> bridge_traits::error::Result<()> {
            Ok(())
        }
        async fn get_bool(&self, _key: &str) -> bridge_traits::error::Result<Option<bool>> {
            Ok(None)
        }
        async fn set_i64(&self, _key: &str, _value: i64) -> bridge_traits::error::Result<()> {
            Ok(())
        }
        async fn get_i64(&self, _key: &str) -> bridge_traits::error::Result<Option<i64>> {
            Ok(None)
        }
        async fn set_f64(&self, _key: &str, _value: f64) -> bridge_traits::error::Result<()> {
            Ok(())
        }
        async fn get_f64(&self, _key: &str) -> bridge_traits::error::Result<Option<f64>> {
            Ok(None)
        }
        async fn delete(&self, key: &str) -> bridge_traits::error::Result<()> {
            self.values.lock().remove(key);
            Ok(())
        }
        async fn has_key(&self, key: &str) -> bridge_traits::error::Result<bool> {
            Ok(self.values.lock().contains_key(key))
        }
    }

    struct FixedClock(i64);
    impl Clock for FixedClock {
        fn now_millis(&self) -> i64 {
            self.0
        }
    }

    fn track(id: &str) -> Track {
        Track {
            id: id.into(),
            title: format!("title-{}", id),
            thumbnail_url: String::new(),
            duration_secs: 1800,
            active_part_id: None,
            audio_url: Some("https://cdn/x".into()),
            audio_bitrate_kbps: Some(192),
            parts: None,
        }
    }

    #[tokio::test]
    async fn toggle_adds_then_removes() {
        let service = FavoritesService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FixedClock(1_700_000_000_000)),
        );
        let t = track("BV1a");

        assert!(service.toggle(&t).await.unwrap());
        assert!(service.is_favorite("BV1a").await.unwrap());

        let list = service.list().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].added_at_ms, 1_700_000_000_000);

        assert!(!service.toggle(&t).await.unwrap());
        assert!(!service.is_favorite("BV1a").await.unwrap());
    }

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        let service = FavoritesService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FixedClock(0)),
        );
        assert!(service.list().await.unwrap().is_empty());
        assert!(!service.is_favorite("BV1a").await.unwrap());
    }
}
