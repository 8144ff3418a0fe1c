//! # Player Engine
//!
//! The [`Player`] facade ties the stores together: playlist and cursor,
//! session mirror of the transport, explicit settings, discovery-driven
//! fetching, and the dispatcher that reacts to transport events (natural
//! ends, stream failures, position updates).
//!
//! Entry points take `&self` and are cheap to call from any task; all
//! mutable state lives behind one lock that is never held across an await.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use bridge_traits::download::{DownloadKind, DownloadProgress, DownloadRequest, Downloader};
use bridge_traits::media::MediaElement;
use bridge_traits::provider::{DiscoveryRequest, GangType, MediaProvider, TrackDetail};
use bridge_traits::proxy::UrlProxy;
use bridge_traits::storage::SettingsStore;
use bridge_traits::time::Clock;
use core_playback::{ErrorKind, MediaTransport, ReadinessStrategy, TransportEvent};
use core_runtime::events::{EventBus, PlayerEvent};

use crate::continuation::{next_action, ContinuationAction};
use crate::error::{PlayerError, Result};
use crate::favorites::FavoritesService;
use crate::models::{Favorite, Track, TrackPatch};
use crate::playlist::{PlaylistStore, RemoveOutcome};
use crate::recovery::{RecoveryDecision, RecoveryState};
use crate::resolver::TrackResolver;
use crate::settings::{AudioQuality, PlayMode, PlayerSettings};

/// How often the sleep-timer watcher checks the deadline.
const SLEEP_TIMER_TICK: Duration = Duration::from_secs(1);

// ============================================================================
// Public Types
// ============================================================================

/// Per-session playback state mirrored from the transport.
///
/// This is display state, reset when the playlist empties; it never
/// persists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub is_playing: bool,
    pub current_time_secs: f64,
    pub duration_secs: f64,
    pub is_loading: bool,
    /// User-presentable error from the last failed operation, if any.
    pub error: Option<String>,
}

/// Which discovery feed a fetch draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// Keyword-pool discovery; honors the user's custom keywords.
    Random,
    /// Solo performances only.
    Solo,
    /// Duo performances only.
    Duo,
}

impl From<GangType> for FetchKind {
    fn from(gang: GangType) -> Self {
        match gang {
            GangType::Solo => FetchKind::Solo,
            GangType::Duo => FetchKind::Duo,
        }
    }
}

impl FetchKind {
    fn discovery_request(self, custom_keywords: Vec<String>) -> DiscoveryRequest {
        match self {
            FetchKind::Random => DiscoveryRequest {
                gang_type: None,
                custom_keywords,
            },
            FetchKind::Solo => DiscoveryRequest {
                gang_type: Some(GangType::Solo),
                custom_keywords: Vec::new(),
            },
            FetchKind::Duo => DiscoveryRequest {
                gang_type: Some(GangType::Duo),
                custom_keywords: Vec::new(),
            },
        }
    }
}

/// Everything the engine needs, stated explicitly.
///
/// All platform behavior arrives through these handles; the engine itself
/// never touches the network, the filesystem, or a real media element.
pub struct PlayerConfig {
    pub provider: Arc<dyn MediaProvider>,
    pub element: Arc<dyn MediaElement>,
    pub strategy: Arc<dyn ReadinessStrategy>,
    pub settings_store: Arc<dyn SettingsStore>,
    pub proxy: Arc<dyn UrlProxy>,
    pub clock: Arc<dyn Clock>,
    /// Absent on platforms without a writable download directory.
    pub downloader: Option<Arc<dyn Downloader>>,
    pub event_bus: EventBus,
    /// Initial settings; call [`Player::load_settings`] to replace them with
    /// the persisted ones.
    pub settings: PlayerSettings,
}

// ============================================================================
// Engine
// ============================================================================

/// Mutable engine state. One lock, never held across an await.
struct Shared {
    playlist: PlaylistStore,
    session: SessionState,
    settings: PlayerSettings,
    recovery: RecoveryState,
    /// Upstream URL currently assigned to the transport, pre-proxy. Used to
    /// tell "resume" apart from "load something else".
    loaded_url: Option<String>,
}

struct Inner {
    shared: Mutex<Shared>,
    transport: MediaTransport,
    resolver: TrackResolver,
    provider: Arc<dyn MediaProvider>,
    favorites: FavoritesService,
    settings_store: Arc<dyn SettingsStore>,
    proxy: Arc<dyn UrlProxy>,
    clock: Arc<dyn Clock>,
    downloader: Option<Arc<dyn Downloader>>,
    events: EventBus,
}

/// The playback engine facade.
///
/// Cheap to clone; clones share all state. Dropping the last clone stops the
/// dispatcher and the sleep-timer watcher.
#[derive(Clone)]
pub struct Player {
    inner: Arc<Inner>,
}

impl Player {
    /// Builds the engine and spawns its background tasks.
    ///
    /// Must be called within a Tokio runtime.
    pub fn new(config: PlayerConfig) -> Self {
        let (transport, transport_rx) = MediaTransport::new(config.element, config.strategy);

        let inner = Arc::new(Inner {
            shared: Mutex::new(Shared {
                playlist: PlaylistStore::new(),
                session: SessionState::default(),
                settings: config.settings,
                recovery: RecoveryState::new(),
                loaded_url: None,
            }),
            transport,
            resolver: TrackResolver::new(Arc::clone(&config.provider)),
            provider: config.provider,
            favorites: FavoritesService::new(
                Arc::clone(&config.settings_store),
                Arc::clone(&config.clock),
            ),
            settings_store: config.settings_store,
            proxy: config.proxy,
            clock: config.clock,
            downloader: config.downloader,
            events: config.event_bus,
        });

        spawn_dispatcher(&inner, transport_rx);
        spawn_sleep_watcher(&inner);

        Self { inner }
    }

    /// Replaces the in-memory settings with the persisted ones and pushes
    /// the audible volume to the transport.
    pub async fn load_settings(&self) -> Result<()> {
        let loaded = PlayerSettings::load(&*self.inner.settings_store).await?;
        let volume = {
            let mut shared = self.inner.shared.lock();
            shared.settings = loaded;
            effective_volume(&shared.settings)
        };
        self.inner.transport.set_volume(volume).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Current session state.
    pub fn session(&self) -> SessionState {
        self.inner.shared.lock().session.clone()
    }

    /// Current settings.
    pub fn settings(&self) -> PlayerSettings {
        self.inner.shared.lock().settings.clone()
    }

    /// Copy of the playlist.
    pub fn playlist(&self) -> Vec<Track> {
        self.inner.shared.lock().playlist.snapshot()
    }

    /// Current cursor position.
    pub fn cursor(&self) -> Option<usize> {
        self.inner.shared.lock().playlist.cursor()
    }

    /// The entry under the cursor, if any.
    pub fn current_track(&self) -> Option<Track> {
        self.inner.shared.lock().playlist.current().cloned()
    }

    // ------------------------------------------------------------------
    // Fetching
    // ------------------------------------------------------------------

    /// Discover a fresh track, append it and start playing it.
    ///
    /// The entry appears in the playlist immediately as a placeholder; its
    /// stream URL is patched in once resolution completes. Finding nothing
    /// is not an error and leaves the playlist untouched.
    #[instrument(skip(self))]
    pub async fn fetch_and_play(&self, kind: FetchKind) -> Result<()> {
        self.inner.fetch_and_play(kind).await
    }

    /// Re-fetch and play a persisted favorite.
    ///
    /// Favorites keep only metadata; the stream link is re-resolved because
    /// the persisted one has long expired.
    #[instrument(skip(self, favorite), fields(track_id = %favorite.id))]
    pub async fn play_favorite(&self, favorite: &Favorite) -> Result<()> {
        self.inner.clear_error();
        self.inner.set_loading(true);

        let detail = match self.inner.provider.track_detail(&favorite.id).await {
            Ok(detail) => detail,
            Err(e) => {
                self.inner.set_loading(false);
                self.inner.surface_error(e.to_string());
                return Err(e.into());
            }
        };
        self.inner.append_and_play(detail).await
    }

    // ------------------------------------------------------------------
    // Transport control
    // ------------------------------------------------------------------

    /// Resume (or start) playback of the current entry.
    ///
    /// A no-op when nothing is selected or the entry has no resolved source
    /// yet.
    pub async fn play(&self) -> Result<()> {
        let (url, loaded) = {
            let shared = self.inner.shared.lock();
            (
                shared.playlist.current().and_then(|t| t.audio_url.clone()),
                shared.loaded_url.clone(),
            )
        };
        let Some(url) = url else {
            debug!("play called with no resolvable current entry");
            return Ok(());
        };
        if loaded.as_deref() == Some(url.as_str()) {
            self.inner.transport.play().await?;
        } else {
            self.inner.start_source(&url).await?;
        }
        Ok(())
    }

    /// Pause playback.
    pub async fn pause(&self) -> Result<()> {
        self.inner.transport.pause().await?;
        self.inner.set_playing(false);
        Ok(())
    }

    /// Pause when playing, play when paused.
    pub async fn toggle_play(&self) -> Result<()> {
        let playing = self.inner.shared.lock().session.is_playing;
        if playing {
            self.pause().await
        } else {
            self.play().await
        }
    }

    /// Seek to an absolute position in seconds.
    pub async fn seek(&self, position_secs: f64) -> Result<()> {
        let position = Duration::from_secs_f64(position_secs.max(0.0));
        self.inner.transport.seek(position).await?;
        let duration = {
            let mut shared = self.inner.shared.lock();
            shared.session.current_time_secs = position.as_secs_f64();
            shared.session.duration_secs
        };
        self.inner.emit(PlayerEvent::TimeUpdate {
            position_secs: position.as_secs_f64(),
            duration_secs: duration,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Playlist navigation
    // ------------------------------------------------------------------

    /// Play the next playlist entry, when there is one.
    pub async fn next(&self) -> Result<()> {
        let target = {
            let shared = self.inner.shared.lock();
            shared
                .playlist
                .cursor()
                .map(|c| c + 1)
                .filter(|&n| n < shared.playlist.len())
        };
        match target {
            Some(index) => self.inner.play_index(index).await,
            None => Ok(()),
        }
    }

    /// Play the previous playlist entry, when there is one.
    pub async fn prev(&self) -> Result<()> {
        let target = {
            let shared = self.inner.shared.lock();
            shared.playlist.cursor().filter(|&c| c > 0).map(|c| c - 1)
        };
        match target {
            Some(index) => self.inner.play_index(index).await,
            None => Ok(()),
        }
    }

    /// Move the cursor without starting playback.
    pub fn select(&self, index: usize) -> Result<()> {
        {
            let mut shared = self.inner.shared.lock();
            let len = shared.playlist.len();
            if index >= len {
                return Err(PlayerError::IndexOutOfRange { index, len });
            }
            shared.playlist.set_cursor(index);
        }
        self.inner.emit(PlayerEvent::CursorChanged {
            index: Some(index),
        });
        Ok(())
    }

    /// Play the entry at `index`. Collections start at their first part.
    #[instrument(skip(self))]
    pub async fn play_index(&self, index: usize) -> Result<()> {
        self.inner.play_index(index).await
    }

    /// Play one part of the collection at `index`.
    #[instrument(skip(self))]
    pub async fn play_part(&self, index: usize, part_index: usize) -> Result<()> {
        self.inner.play_part(index, part_index).await
    }

    /// Remove the entry at `index`, maintaining the cursor laws.
    ///
    /// Removing the current entry clamps the cursor to a survivor and keeps
    /// playing it when its stream is already resolved; removing the last
    /// entry resets playback entirely.
    #[instrument(skip(self))]
    pub async fn remove(&self, index: usize) -> Result<()> {
        self.inner.remove(index).await
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    /// Set the volume, clamped to `0.0..=1.0`, and persist it.
    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        let (audible, snapshot) = {
            let mut shared = self.inner.shared.lock();
            shared.settings.set_volume(volume);
            (effective_volume(&shared.settings), shared.settings.clone())
        };
        self.inner.transport.set_volume(audible).await?;
        snapshot.save(&*self.inner.settings_store).await
    }

    /// Mute, or restore the pre-mute volume.
    pub async fn toggle_mute(&self) -> Result<()> {
        let (audible, snapshot) = {
            let mut shared = self.inner.shared.lock();
            shared.settings.toggle_mute();
            (effective_volume(&shared.settings), shared.settings.clone())
        };
        self.inner.transport.set_volume(audible).await?;
        snapshot.save(&*self.inner.settings_store).await
    }

    /// Set the playback rate, clamped to `0.5..=2.0`, and persist it.
    pub async fn set_playback_rate(&self, rate: f32) -> Result<()> {
        let snapshot = {
            let mut shared = self.inner.shared.lock();
            shared.settings.set_playback_rate(rate);
            shared.settings.clone()
        };
        self.inner
            .transport
            .set_playback_rate(snapshot.playback_rate)
            .await?;
        snapshot.save(&*self.inner.settings_store).await
    }

    /// Step to the next rate in the cycle and persist it.
    pub async fn cycle_playback_rate(&self) -> Result<f32> {
        let snapshot = {
            let mut shared = self.inner.shared.lock();
            shared.settings.cycle_playback_rate();
            shared.settings.clone()
        };
        self.inner
            .transport
            .set_playback_rate(snapshot.playback_rate)
            .await?;
        snapshot.save(&*self.inner.settings_store).await?;
        Ok(snapshot.playback_rate)
    }

    /// Set the play mode and persist it.
    pub async fn set_play_mode(&self, mode: PlayMode) -> Result<()> {
        let snapshot = {
            let mut shared = self.inner.shared.lock();
            shared.settings.play_mode = mode;
            shared.settings.clone()
        };
        snapshot.save(&*self.inner.settings_store).await
    }

    /// Step to the next play mode in the cycle and persist it.
    pub async fn cycle_play_mode(&self) -> Result<PlayMode> {
        let snapshot = {
            let mut shared = self.inner.shared.lock();
            shared.settings.cycle_play_mode();
            shared.settings.clone()
        };
        snapshot.save(&*self.inner.settings_store).await?;
        Ok(snapshot.play_mode)
    }

    /// Set the category the auto mode fetches from and persist it.
    pub async fn set_gang_type(&self, gang: GangType) -> Result<()> {
        let snapshot = {
            let mut shared = self.inner.shared.lock();
            shared.settings.gang_type = gang;
            shared.settings.clone()
        };
        snapshot.save(&*self.inner.settings_store).await
    }

    /// Set the preferred audio quality and persist it.
    ///
    /// Applies to streams resolved from now on; the current one keeps
    /// playing as is.
    pub async fn set_audio_quality(&self, quality: AudioQuality) -> Result<()> {
        let snapshot = {
            let mut shared = self.inner.shared.lock();
            shared.settings.audio_quality = quality;
            shared.settings.clone()
        };
        snapshot.save(&*self.inner.settings_store).await
    }

    /// Replace the discovery keywords and persist them.
    pub async fn set_custom_keywords(&self, keywords: Vec<String>) -> Result<()> {
        let snapshot = {
            let mut shared = self.inner.shared.lock();
            shared.settings.custom_keywords = keywords;
            shared.settings.clone()
        };
        snapshot.save(&*self.inner.settings_store).await
    }

    /// Arm the sleep timer for `minutes` from now, or disarm it with `None`.
    ///
    /// Session-scoped: the deadline does not survive a restart.
    pub fn set_sleep_timer(&self, minutes: Option<u32>) {
        let deadline = minutes.map(|m| self.inner.clock.now_millis() + i64::from(m) * 60_000);
        self.inner.shared.lock().settings.sleep_timer_deadline_ms = deadline;
        match deadline {
            Some(at) => info!(deadline_ms = at, "sleep timer armed"),
            None => info!("sleep timer disarmed"),
        }
    }

    // ------------------------------------------------------------------
    // Favorites and downloads
    // ------------------------------------------------------------------

    /// Toggle the current track in the favorites list.
    ///
    /// Returns `true` when it is now a favorite.
    pub async fn toggle_favorite(&self) -> Result<bool> {
        let track = self
            .current_track()
            .ok_or(PlayerError::NoCurrentTrack)?;
        self.inner.favorites.toggle(&track).await
    }

    /// The persisted favorites, newest last.
    pub async fn favorites(&self) -> Result<Vec<Favorite>> {
        self.inner.favorites.list().await
    }

    /// Download the current track's stream in the background.
    ///
    /// Progress is forwarded to the event bus; the call returns as soon as
    /// the transfer is scheduled.
    #[instrument(skip(self))]
    pub async fn download_current(&self) -> Result<()> {
        let track = self
            .current_track()
            .ok_or(PlayerError::NoCurrentTrack)?;
        let url = track
            .audio_url
            .clone()
            .ok_or_else(|| PlayerError::NoPlayableSource {
                track_id: track.id.clone(),
            })?;
        let downloader = self
            .inner
            .downloader
            .clone()
            .ok_or_else(|| PlayerError::Bridge(bridge_traits::error::BridgeError::NotAvailable(
                "no downloader on this platform".into(),
            )))?;

        let display_name = match track
            .active_part_index()
            .and_then(|i| track.parts.as_ref().and_then(|p| p.get(i)))
            .filter(|_| track.is_collection())
        {
            Some(part) => format!("{} - {}", track.title, part.title),
            None => track.title.clone(),
        };
        let sub_folder = track.is_collection().then(|| track.title.clone());

        let request = DownloadRequest {
            url,
            display_name,
            kind: DownloadKind::Audio,
            destination: None,
            sub_folder,
        };

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let events = self.inner.events.clone();
        tokio::spawn(async move {
            while let Some(progress) = progress_rx.recv().await {
                let event = match progress {
                    DownloadProgress::Percent(percent) => {
                        PlayerEvent::DownloadProgress { percent }
                    }
                    DownloadProgress::Failed(message) => PlayerEvent::DownloadFailed { message },
                };
                let _ = events.emit(event);
            }
        });

        tokio::spawn(async move {
            match downloader.download(request, progress_tx).await {
                Ok(path) => info!(path = %path.display(), "download finished"),
                Err(e) => warn!(error = %e, "download failed"),
            }
        });
        Ok(())
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shared = self.inner.shared.lock();
        f.debug_struct("Player")
            .field("playlist_len", &shared.playlist.len())
            .field("cursor", &shared.playlist.cursor())
            .field("session", &shared.session)
            .finish()
    }
}

// ============================================================================
// Internals
// ============================================================================

fn effective_volume(settings: &PlayerSettings) -> f32 {
    if settings.muted {
        0.0
    } else {
        settings.volume
    }
}

impl Inner {
    fn emit(&self, event: PlayerEvent) {
        let _ = self.events.emit(event);
    }

    fn set_loading(&self, loading: bool) {
        let changed = {
            let mut shared = self.shared.lock();
            let changed = shared.session.is_loading != loading;
            shared.session.is_loading = loading;
            changed
        };
        if changed {
            self.emit(PlayerEvent::LoadingChanged { loading });
        }
    }

    fn set_playing(&self, playing: bool) {
        let changed = {
            let mut shared = self.shared.lock();
            let changed = shared.session.is_playing != playing;
            shared.session.is_playing = playing;
            changed
        };
        if changed {
            self.emit(PlayerEvent::PlaybackStateChanged { playing });
        }
    }

    fn surface_error(&self, message: String) {
        warn!(%message, "surfacing playback error");
        self.shared.lock().session.error = Some(message.clone());
        self.emit(PlayerEvent::ErrorRaised { message });
    }

    fn clear_error(&self) {
        let had_error = self.shared.lock().session.error.take().is_some();
        if had_error {
            self.emit(PlayerEvent::ErrorCleared);
        }
    }

    /// Rewrite `url` through the proxy and hand it to the transport.
    async fn start_source(&self, url: &str) -> Result<()> {
        let (rate, volume) = {
            let shared = self.shared.lock();
            (
                shared.settings.playback_rate,
                effective_volume(&shared.settings),
            )
        };
        let playable = self.proxy.rewrite(url).await?;
        self.shared.lock().loaded_url = Some(url.to_string());
        self.transport.load(&playable, rate).await?;
        self.transport.set_volume(volume).await?;
        Ok(())
    }

    /// Replays the current source from the top, re-applying the configured
    /// playback rate.
    async fn replay_current(&self) -> Result<()> {
        let rate = self.shared.lock().settings.playback_rate;
        self.transport.seek(Duration::ZERO).await?;
        self.transport.set_playback_rate(rate).await?;
        self.transport.play().await?;
        Ok(())
    }

    async fn fetch_and_play(&self, kind: FetchKind) -> Result<()> {
        self.clear_error();
        self.set_loading(true);

        let request = {
            let shared = self.shared.lock();
            kind.discovery_request(shared.settings.custom_keywords.clone())
        };

        let detail = match self.provider.discover(request).await {
            Ok(detail) => detail,
            Err(e) => {
                self.set_loading(false);
                self.surface_error(e.to_string());
                return Err(e.into());
            }
        };
        let Some(detail) = detail else {
            self.set_loading(false);
            info!("discovery found nothing new");
            return Ok(());
        };

        self.append_and_play(detail).await
    }

    /// Append `detail` as an optimistic placeholder, resolve its stream and
    /// start playing it. Expects the loading flag to already be set.
    async fn append_and_play(&self, detail: TrackDetail) -> Result<()> {
        let track = Track::from(detail);
        let track_id = track.id.clone();
        let title = track.title.clone();
        let part_id = track.active_part_id.clone();

        // The insert index is captured here; the patch below targets it even
        // if entries were removed in the meantime and the patch goes stale.
        let (index, len, quality) = {
            let mut shared = self.shared.lock();
            let index = shared.playlist.append_placeholder(track);
            shared.playlist.set_cursor(index);
            (index, shared.playlist.len(), shared.settings.audio_quality)
        };
        self.emit(PlayerEvent::PlaylistChanged { len });
        self.emit(PlayerEvent::CursorChanged { index: Some(index) });
        self.emit(PlayerEvent::TrackStarted {
            track_id: track_id.clone(),
            title,
        });

        let Some(part_id) = part_id else {
            self.set_loading(false);
            let err = PlayerError::NoPlayableSource { track_id };
            self.surface_error(err.to_string());
            return Err(err);
        };

        match self.resolver.resolve(&track_id, &part_id, quality).await {
            Ok(source) => {
                {
                    let mut shared = self.shared.lock();
                    shared.playlist.patch(
                        index,
                        TrackPatch {
                            active_part_id: Some(part_id),
                            audio_url: Some(source.url.clone()),
                            audio_bitrate_kbps: Some(source.bitrate_kbps),
                        },
                    );
                }
                self.set_loading(false);
                self.start_source(&source.url).await
            }
            Err(e) => {
                self.set_loading(false);
                self.surface_error(e.to_string());
                Err(e)
            }
        }
    }

    async fn play_index(&self, index: usize) -> Result<()> {
        let snapshot = {
            let shared = self.shared.lock();
            let len = shared.playlist.len();
            match shared.playlist.get(index) {
                Some(track) => Ok(track.clone()),
                None => Err(PlayerError::IndexOutOfRange { index, len }),
            }
        }?;

        if snapshot.is_collection() {
            return self.play_part(index, 0).await;
        }

        if let Some(url) = snapshot.audio_url.clone() {
            self.shared.lock().playlist.set_cursor(index);
            self.emit(PlayerEvent::CursorChanged { index: Some(index) });
            self.emit(PlayerEvent::TrackStarted {
                track_id: snapshot.id.clone(),
                title: snapshot.title.clone(),
            });
            return self.start_source(&url).await;
        }

        // Unresolved placeholder: resolve in place, then play.
        let Some(part_id) = snapshot.active_part_id.clone() else {
            debug!(index, "entry has no playable part, skipping");
            return Ok(());
        };
        let quality = self.shared.lock().settings.audio_quality;
        match self.resolver.resolve(&snapshot.id, &part_id, quality).await {
            Ok(source) => {
                {
                    let mut shared = self.shared.lock();
                    shared
                        .playlist
                        .patch(index, TrackPatch::resolved(&source.url, source.bitrate_kbps));
                    shared.playlist.set_cursor(index);
                }
                self.emit(PlayerEvent::CursorChanged { index: Some(index) });
                self.emit(PlayerEvent::TrackStarted {
                    track_id: snapshot.id,
                    title: snapshot.title,
                });
                self.start_source(&source.url).await
            }
            Err(e) => {
                self.surface_error(e.to_string());
                Err(e)
            }
        }
    }

    async fn play_part(&self, index: usize, part_index: usize) -> Result<()> {
        let (track, part, quality) = {
            let shared = self.shared.lock();
            let len = shared.playlist.len();
            let track = shared
                .playlist
                .get(index)
                .cloned()
                .ok_or(PlayerError::IndexOutOfRange { index, len })?;
            let part = track
                .parts
                .as_ref()
                .and_then(|p| p.get(part_index))
                .cloned()
                .ok_or(PlayerError::IndexOutOfRange {
                    index: part_index,
                    len: track.part_count(),
                })?;
            (track, part, shared.settings.audio_quality)
        };

        match self.resolver.resolve(&track.id, &part.part_id, quality).await {
            Ok(source) => {
                {
                    let mut shared = self.shared.lock();
                    shared.playlist.patch(
                        index,
                        TrackPatch {
                            active_part_id: Some(part.part_id.clone()),
                            audio_url: Some(source.url.clone()),
                            audio_bitrate_kbps: Some(source.bitrate_kbps),
                        },
                    );
                    shared.playlist.set_cursor(index);
                }
                self.emit(PlayerEvent::CursorChanged { index: Some(index) });
                self.emit(PlayerEvent::TrackStarted {
                    track_id: track.id,
                    title: format!("{} - {}", track.title, part.title),
                });
                self.start_source(&source.url).await
            }
            Err(e) => {
                // A dead part should not tear the whole collection down.
                warn!(index, part_index, error = %e, "part did not resolve");
                Ok(())
            }
        }
    }

    async fn remove(&self, index: usize) -> Result<()> {
        let (outcome, len) = {
            let mut shared = self.shared.lock();
            let outcome = shared.playlist.remove(index);
            (outcome, shared.playlist.len())
        };
        self.emit(PlayerEvent::PlaylistChanged { len });

        match outcome {
            RemoveOutcome::CursorUnchanged => Ok(()),
            RemoveOutcome::CursorShifted { index } => {
                self.emit(PlayerEvent::CursorChanged { index: Some(index) });
                Ok(())
            }
            RemoveOutcome::BecameEmpty => {
                self.transport.clear().await?;
                {
                    let mut shared = self.shared.lock();
                    shared.session = SessionState::default();
                    shared.loaded_url = None;
                    shared.recovery.reset();
                }
                self.emit(PlayerEvent::CursorChanged { index: None });
                self.emit(PlayerEvent::PlaybackStateChanged { playing: false });
                Ok(())
            }
            RemoveOutcome::CursorClamped {
                index,
                autoplay_url,
            } => {
                self.emit(PlayerEvent::CursorChanged { index: Some(index) });
                match autoplay_url {
                    Some(url) => self.start_source(&url).await,
                    None => {
                        // Survivor is an unresolved placeholder; stop rather
                        // than keep playing the removed entry's audio.
                        self.transport.clear().await?;
                        self.shared.lock().loaded_url = None;
                        self.set_playing(false);
                        Ok(())
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Transport event handling
    // ------------------------------------------------------------------

    async fn on_transport_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Playing => {
                self.shared.lock().recovery.reset();
                self.set_playing(true);
            }
            TransportEvent::Paused => self.set_playing(false),
            TransportEvent::TimeUpdate { position } => {
                let (position_secs, duration_secs) = {
                    let mut shared = self.shared.lock();
                    shared.session.current_time_secs = position.as_secs_f64();
                    (
                        shared.session.current_time_secs,
                        shared.session.duration_secs,
                    )
                };
                self.emit(PlayerEvent::TimeUpdate {
                    position_secs,
                    duration_secs,
                });
            }
            TransportEvent::DurationKnown { duration } => {
                let (position_secs, duration_secs) = {
                    let mut shared = self.shared.lock();
                    shared.session.duration_secs = duration.as_secs_f64();
                    (
                        shared.session.current_time_secs,
                        shared.session.duration_secs,
                    )
                };
                self.emit(PlayerEvent::TimeUpdate {
                    position_secs,
                    duration_secs,
                });
            }
            TransportEvent::Ended => self.on_ended().await,
            TransportEvent::Errored { kind } => self.on_stream_error(kind).await,
        }
    }

    /// The current source played to its natural end; decide and perform the
    /// follow-up.
    async fn on_ended(&self) {
        let (action, cursor) = {
            let shared = self.shared.lock();
            let cursor = shared.playlist.cursor();
            let collection = shared.playlist.current().and_then(|t| {
                if t.is_collection() {
                    Some((t.active_part_index().unwrap_or(0), t.part_count()))
                } else {
                    None
                }
            });
            (
                next_action(
                    shared.settings.play_mode,
                    shared.playlist.len(),
                    cursor,
                    collection,
                ),
                cursor,
            )
        };
        debug!(?action, "track ended");

        let result = match action {
            ContinuationAction::AdvancePart(part_index) => match cursor {
                Some(index) => self.play_part(index, part_index).await,
                None => Ok(()),
            },
            ContinuationAction::Restart => self.replay_current().await,
            ContinuationAction::Advance(index) => self.play_index(index).await,
            ContinuationAction::WrapToStart => self.play_index(0).await,
            ContinuationAction::FetchFresh => {
                let gang = self.shared.lock().settings.gang_type;
                self.fetch_and_play(FetchKind::from(gang)).await
            }
            ContinuationAction::Stop => {
                self.set_playing(false);
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!(error = %e, "continuation failed");
        }
    }

    /// The transport reported a playback failure.
    ///
    /// Recoverable failures (network drop, rejected link) trigger a bounded
    /// re-resolve of the current stream; anything else surfaces at once.
    async fn on_stream_error(&self, kind: ErrorKind) {
        let (empty, decision) = {
            let mut shared = self.shared.lock();
            if shared.playlist.is_empty() {
                (true, RecoveryDecision::GiveUp)
            } else if kind.is_recoverable() {
                (false, shared.recovery.on_failure())
            } else {
                (false, RecoveryDecision::GiveUp)
            }
        };
        if empty {
            debug!(?kind, "error with empty playlist, ignoring");
            return;
        }
        if !kind.is_recoverable() || decision == RecoveryDecision::GiveUp {
            self.surface_error(kind.describe());
            self.set_playing(false);
            return;
        }
        self.attempt_recovery(kind).await;
    }

    /// One recovery attempt: invalidate the dead link, resolve a fresh one
    /// for the same (track, part), patch it in and reload.
    async fn attempt_recovery(&self, kind: ErrorKind) {
        let snapshot = {
            let shared = self.shared.lock();
            shared
                .playlist
                .cursor()
                .and_then(|c| shared.playlist.get(c).map(|t| (c, t.clone())))
                .map(|(c, t)| (c, t, shared.settings.audio_quality, shared.recovery.failures()))
        };
        let Some((index, track, quality, attempt)) = snapshot else {
            self.surface_error(kind.describe());
            return;
        };
        let Some(part_id) = track.active_part_id.clone() else {
            self.surface_error(kind.describe());
            return;
        };

        info!(track_id = %track.id, attempt, "re-resolving stream after failure");
        if let Some(dead) = track.audio_url.as_deref() {
            self.resolver.invalidate(dead);
        }

        match self.resolver.resolve(&track.id, &part_id, quality).await {
            Ok(source) => {
                self.shared
                    .lock()
                    .playlist
                    .patch(index, TrackPatch::resolved(&source.url, source.bitrate_kbps));
                self.clear_error();
                if let Err(e) = self.start_source(&source.url).await {
                    self.surface_error(e.to_string());
                }
            }
            Err(e) => {
                debug!(error = %e, "re-resolution failed");
                self.surface_error(kind.describe());
                self.set_playing(false);
            }
        }
    }
}

// ============================================================================
// Background Tasks
// ============================================================================

/// The single consumer of transport events. Holding only a weak handle lets
/// the engine shut down when the last `Player` clone is dropped.
fn spawn_dispatcher(inner: &Arc<Inner>, mut rx: mpsc::UnboundedReceiver<TransportEvent>) {
    let weak = Arc::downgrade(inner);
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Some(inner) = weak.upgrade() else { break };
            inner.on_transport_event(event).await;
        }
        debug!("transport dispatcher stopped");
    });
}

/// Once-a-second deadline check for the sleep timer.
fn spawn_sleep_watcher(inner: &Arc<Inner>) {
    let weak: Weak<Inner> = Arc::downgrade(inner);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SLEEP_TIMER_TICK);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let Some(inner) = weak.upgrade() else { break };
            let due = {
                let mut shared = inner.shared.lock();
                match shared.settings.sleep_timer_deadline_ms {
                    Some(deadline) if inner.clock.now_millis() >= deadline => {
                        shared.settings.sleep_timer_deadline_ms = None;
                        true
                    }
                    _ => false,
                }
            };
            if due {
                info!("sleep timer fired, pausing");
                if let Err(e) = inner.transport.pause().await {
                    warn!(error = %e, "sleep timer pause failed");
                }
                inner.set_playing(false);
            }
        }
        debug!("sleep watcher stopped");
    });
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::media::MediaElementEvent;
    use bridge_traits::provider::{
        AudioRenditions, PartSummary, Rendition, TrackSummary,
    };
    use core_playback::EagerPlayback;
    use mockall::mock;
    use parking_lot::Mutex as PlMutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicI64, Ordering};
    use tokio::sync::broadcast;

    mock! {
        Element {}

        #[async_trait]
        impl MediaElement for Element {
            async fn set_source(&self, url: &str) -> BridgeResult<()>;
            async fn clear_source(&self) -> BridgeResult<()>;
            async fn play(&self) -> BridgeResult<()>;
            async fn pause(&self) -> BridgeResult<()>;
            async fn set_position(&self, position: Duration) -> BridgeResult<()>;
            async fn set_volume(&self, volume: f32) -> BridgeResult<()>;
            async fn set_playback_rate(&self, rate: f32) -> BridgeResult<()>;
            async fn buffered_ahead(&self) -> BridgeResult<Duration>;
            async fn has_enough_data(&self) -> BridgeResult<bool>;
            async fn current_source(&self) -> BridgeResult<Option<String>>;
            fn events(&self) -> broadcast::Receiver<MediaElementEvent>;
        }
    }

    mock! {
        Provider {}

        #[async_trait]
        impl MediaProvider for Provider {
            async fn search(&self, keyword: &str, page: u32) -> BridgeResult<Vec<TrackSummary>>;
            async fn track_detail(&self, track_id: &str) -> BridgeResult<TrackDetail>;
            async fn audio_renditions(
                &self,
                track_id: &str,
                part_id: &str,
            ) -> BridgeResult<AudioRenditions>;
            async fn discover(
                &self,
                request: DiscoveryRequest,
            ) -> BridgeResult<Option<TrackDetail>>;
        }
    }

    struct MemoryStore {
        values: PlMutex<HashMap<String, String>>,
    }

    impl MemoryStore {
        fn new() -> Self {
            Self {
                values: PlMutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl SettingsStore for MemoryStore {
        async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()> {
            self.values.lock().insert(key.into(), value.into());
            Ok(())
        }
        async fn get_string(&self, key: &str) -> BridgeResult<Option<String>> {
            Ok(self.values.lock().get(key).cloned())
        }
        async fn set_bool(&self, _key: &str, _value: bool) -> BridgeResult<()> {
            Ok(())
        }
        async fn get_bool(&self, _key: &str) -> BridgeResult<Option<bool>> {
            Ok(None)
        }
        async fn set_i64(&self, _key: &str, _value: i64) -> BridgeResult<()> {
            Ok(())
        }
        async fn get_i64(&self, _key: &str) -> BridgeResult<Option<i64>> {
            Ok(None)
        }
        async fn set_f64(&self, _key: &str, _value: f64) -> BridgeResult<()> {
            Ok(())
        }
        async fn get_f64(&self, _key: &str) -> BridgeResult<Option<f64>> {
            Ok(None)
        }
        async fn delete(&self, key: &str) -> BridgeResult<()> {
            self.values.lock().remove(key);
            Ok(())
        }
        async fn has_key(&self, key: &str) -> BridgeResult<bool> {
            Ok(self.values.lock().contains_key(key))
        }
    }

    struct IdentityProxy;

    #[async_trait]
    impl UrlProxy for IdentityProxy {
        async fn rewrite(&self, url: &str) -> BridgeResult<String> {
            Ok(url.to_string())
        }
    }

    struct TestClock(AtomicI64);

    impl Clock for TestClock {
        fn now_millis(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn detail(id: &str, parts: usize) -> TrackDetail {
        TrackDetail {
            summary: TrackSummary {
                id: id.to_string(),
                title: format!("title-{}", id),
                thumbnail_url: String::new(),
                duration_secs: 120,
                default_part_id: Some(format!("{}-p0", id)),
            },
            parts: (0..parts)
                .map(|i| PartSummary {
                    part_id: format!("{}-p{}", id, i),
                    title: format!("part-{}", i),
                    duration_secs: 60,
                })
                .collect(),
        }
    }

    fn ranked(url: &str) -> AudioRenditions {
        AudioRenditions::Ranked(vec![Rendition {
            url: url.to_string(),
            bitrate_kbps: 192,
        }])
    }

    /// Element that accepts every control call and replays scripted events.
    fn permissive_element() -> (MockElement, broadcast::Sender<MediaElementEvent>) {
        let (tx, _) = broadcast::channel(32);
        let mut element = MockElement::new();
        let events_tx = tx.clone();
        element
            .expect_events()
            .returning(move || events_tx.subscribe());
        element.expect_set_source().returning(|_| Ok(()));
        element.expect_clear_source().returning(|| Ok(()));
        element.expect_play().returning(|| Ok(()));
        element.expect_pause().returning(|| Ok(()));
        element.expect_set_position().returning(|_| Ok(()));
        element.expect_set_volume().returning(|_| Ok(()));
        element.expect_set_playback_rate().returning(|_| Ok(()));
        element
            .expect_current_source()
            .returning(|| Ok(Some("x".into())));
        (element, tx)
    }

    fn player_with(provider: MockProvider, element: MockElement) -> Player {
        Player::new(PlayerConfig {
            provider: Arc::new(provider),
            element: Arc::new(element),
            strategy: Arc::new(EagerPlayback),
            settings_store: Arc::new(MemoryStore::new()),
            proxy: Arc::new(IdentityProxy),
            clock: Arc::new(TestClock(AtomicI64::new(1_000_000))),
            downloader: None,
            event_bus: EventBus::new(64),
            settings: PlayerSettings::default(),
        })
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn fetch_inserts_placeholder_then_patches_in_the_stream() {
        let mut provider = MockProvider::new();
        provider
            .expect_discover()
            .times(1)
            .returning(|_| Ok(Some(detail("t1", 1))));
        provider
            .expect_audio_renditions()
            .times(1)
            .returning(|_, _| Ok(ranked("https://cdn.example.com/t1.m4a")));

        let (element, tx) = permissive_element();
        let player = player_with(provider, element);

        player.fetch_and_play(FetchKind::Random).await.unwrap();
        // Readiness gate runs in the background.
        tx.send(MediaElementEvent::CanPlayThrough).unwrap();
        settle().await;

        let playlist = player.playlist();
        assert_eq!(playlist.len(), 1);
        assert_eq!(
            playlist[0].audio_url.as_deref(),
            Some("https://cdn.example.com/t1.m4a")
        );
        assert_eq!(player.cursor(), Some(0));
        assert!(!player.session().is_loading);
    }

    #[tokio::test]
    async fn discovery_miss_leaves_playlist_untouched() {
        let mut provider = MockProvider::new();
        provider.expect_discover().times(1).returning(|_| Ok(None));

        let (element, _tx) = permissive_element();
        let player = player_with(provider, element);

        player.fetch_and_play(FetchKind::Solo).await.unwrap();
        assert!(player.playlist().is_empty());
        assert!(player.session().error.is_none());
        assert!(!player.session().is_loading);
    }

    #[tokio::test]
    async fn solo_fetch_requests_the_solo_category() {
        let mut provider = MockProvider::new();
        provider
            .expect_discover()
            .times(1)
            .withf(|req| req.gang_type == Some(GangType::Solo))
            .returning(|_| Ok(None));

        let (element, _tx) = permissive_element();
        let player = player_with(provider, element);
        player.fetch_and_play(FetchKind::Solo).await.unwrap();
    }

    #[tokio::test]
    async fn ended_in_auto_mode_fetches_fresh_content_at_the_edge() {
        let mut provider = MockProvider::new();
        let mut discoveries = 0u32;
        provider.expect_discover().times(2).returning(move |req| {
            discoveries += 1;
            // Refetch at the edge uses the configured category, not the
            // keyword pool.
            if discoveries == 2 {
                assert_eq!(req.gang_type, Some(GangType::Solo));
            }
            Ok(Some(detail(&format!("t{}", discoveries), 1)))
        });
        provider
            .expect_audio_renditions()
            .times(2)
            .returning(|track_id, _| Ok(ranked(&format!("https://cdn.example.com/{}.m4a", track_id))));

        let (element, tx) = permissive_element();
        let player = player_with(provider, element);

        player.fetch_and_play(FetchKind::Random).await.unwrap();
        tx.send(MediaElementEvent::CanPlayThrough).unwrap();
        settle().await;

        tx.send(MediaElementEvent::Ended).unwrap();
        settle().await;

        assert_eq!(player.playlist().len(), 2);
        assert_eq!(player.cursor(), Some(1));
    }

    #[tokio::test]
    async fn recoverable_error_re_resolves_then_gives_up_past_the_ceiling() {
        let mut provider = MockProvider::new();
        provider
            .expect_discover()
            .times(1)
            .returning(|_| Ok(Some(detail("t1", 1))));
        let mut resolutions = 0u32;
        provider
            .expect_audio_renditions()
            .returning(move |_, _| {
                resolutions += 1;
                Ok(ranked(&format!("https://cdn.example.com/v{}.m4a", resolutions)))
            });

        let (element, tx) = permissive_element();
        let player = player_with(provider, element);

        player.fetch_and_play(FetchKind::Random).await.unwrap();
        tx.send(MediaElementEvent::CanPlayThrough).unwrap();
        settle().await;

        // Two network failures re-resolve; the URL moves past v1.
        for _ in 0..2 {
            tx.send(MediaElementEvent::Error { code: 2 }).unwrap();
            settle().await;
            tx.send(MediaElementEvent::CanPlayThrough).unwrap();
            settle().await;
        }
        let playlist = player.playlist();
        assert_eq!(
            playlist[0].audio_url.as_deref(),
            Some("https://cdn.example.com/v3.m4a")
        );
        assert!(player.session().error.is_none());

        // Without an intervening Playing event the failure streak stands,
        // so the third failure surfaces.
        tx.send(MediaElementEvent::Error { code: 2 }).unwrap();
        settle().await;
        assert!(player.session().error.is_some());
        assert!(!player.session().is_playing);
    }

    #[tokio::test]
    async fn decode_error_surfaces_without_retry() {
        let mut provider = MockProvider::new();
        provider
            .expect_discover()
            .times(1)
            .returning(|_| Ok(Some(detail("t1", 1))));
        provider
            .expect_audio_renditions()
            .times(1)
            .returning(|_, _| Ok(ranked("https://cdn.example.com/t1.m4a")));

        let (element, tx) = permissive_element();
        let player = player_with(provider, element);

        player.fetch_and_play(FetchKind::Random).await.unwrap();
        tx.send(MediaElementEvent::CanPlayThrough).unwrap();
        settle().await;

        tx.send(MediaElementEvent::Error { code: 3 }).unwrap();
        settle().await;
        assert_eq!(
            player.session().error.as_deref(),
            Some("audio stream could not be decoded")
        );
    }

    #[tokio::test]
    async fn removing_the_last_entry_resets_the_session() {
        let mut provider = MockProvider::new();
        provider
            .expect_discover()
            .times(1)
            .returning(|_| Ok(Some(detail("t1", 1))));
        provider
            .expect_audio_renditions()
            .times(1)
            .returning(|_, _| Ok(ranked("https://cdn.example.com/t1.m4a")));

        let (element, tx) = permissive_element();
        let player = player_with(provider, element);

        player.fetch_and_play(FetchKind::Random).await.unwrap();
        tx.send(MediaElementEvent::CanPlayThrough).unwrap();
        tx.send(MediaElementEvent::Playing).unwrap();
        settle().await;
        assert!(player.session().is_playing);

        player.remove(0).await.unwrap();
        assert!(player.playlist().is_empty());
        assert_eq!(player.cursor(), None);
        assert_eq!(player.session(), SessionState::default());
    }

    #[tokio::test]
    async fn removing_the_current_entry_plays_the_resolved_survivor() {
        let mut provider = MockProvider::new();
        let mut discoveries = 0u32;
        provider.expect_discover().times(2).returning(move |_| {
            discoveries += 1;
            Ok(Some(detail(&format!("t{}", discoveries), 1)))
        });
        provider
            .expect_audio_renditions()
            .times(2)
            .returning(|track_id, _| Ok(ranked(&format!("https://cdn.example.com/{}.m4a", track_id))));

        let (element, tx) = permissive_element();
        let player = player_with(provider, element);

        player.fetch_and_play(FetchKind::Random).await.unwrap();
        player.fetch_and_play(FetchKind::Random).await.unwrap();
        settle().await;
        assert_eq!(player.cursor(), Some(1));

        // Removing index 1 clamps onto index 0, which has a resolved stream.
        player.remove(1).await.unwrap();
        tx.send(MediaElementEvent::CanPlayThrough).unwrap();
        settle().await;
        assert_eq!(player.cursor(), Some(0));
        assert_eq!(player.playlist().len(), 1);
    }

    #[tokio::test]
    async fn collection_ended_advances_to_the_next_part() {
        let mut provider = MockProvider::new();
        provider
            .expect_discover()
            .times(1)
            .returning(|_| Ok(Some(detail("t1", 3))));
        provider
            .expect_audio_renditions()
            .returning(|_, part_id| Ok(ranked(&format!("https://cdn.example.com/{}.m4a", part_id))));

        let (element, tx) = permissive_element();
        let player = player_with(provider, element);

        player.fetch_and_play(FetchKind::Random).await.unwrap();
        tx.send(MediaElementEvent::CanPlayThrough).unwrap();
        settle().await;
        assert_eq!(
            player.current_track().unwrap().active_part_id.as_deref(),
            Some("t1-p0")
        );

        tx.send(MediaElementEvent::Ended).unwrap();
        settle().await;
        let track = player.current_track().unwrap();
        assert_eq!(track.active_part_id.as_deref(), Some("t1-p1"));
        assert_eq!(
            track.audio_url.as_deref(),
            Some("https://cdn.example.com/t1-p1.m4a")
        );
    }

    #[tokio::test]
    async fn single_mode_replay_reapplies_the_playback_rate() {
        let mut provider = MockProvider::new();
        provider
            .expect_discover()
            .times(1)
            .returning(|_| Ok(Some(detail("t1", 1))));
        provider
            .expect_audio_renditions()
            .times(1)
            .returning(|_, _| Ok(ranked("https://cdn.example.com/t1.m4a")));

        let (tx, _) = broadcast::channel(32);
        let mut element = MockElement::new();
        let events_tx = tx.clone();
        element
            .expect_events()
            .returning(move || events_tx.subscribe());
        element.expect_set_source().returning(|_| Ok(()));
        element.expect_play().returning(|| Ok(()));
        element.expect_pause().returning(|| Ok(()));
        element.expect_set_position().returning(|_| Ok(()));
        element.expect_set_volume().returning(|_| Ok(()));
        element
            .expect_current_source()
            .returning(|| Ok(Some("x".into())));
        let rates = Arc::new(PlMutex::new(Vec::new()));
        let seen = Arc::clone(&rates);
        element.expect_set_playback_rate().returning(move |rate| {
            seen.lock().push(rate);
            Ok(())
        });

        let player = player_with(provider, element);
        player.set_play_mode(PlayMode::Single).await.unwrap();
        player.set_playback_rate(1.5).await.unwrap();

        player.fetch_and_play(FetchKind::Random).await.unwrap();
        tx.send(MediaElementEvent::CanPlayThrough).unwrap();
        settle().await;
        let applied_before_replay = rates.lock().len();

        tx.send(MediaElementEvent::Ended).unwrap();
        settle().await;

        // The replay pushed the configured rate to the element again.
        assert!(rates.lock().len() > applied_before_replay);
        assert_eq!(*rates.lock().last().unwrap(), 1.5);
        // Single mode replays the same entry rather than advancing.
        assert_eq!(player.current_track().unwrap().id, "t1");
    }

    #[tokio::test]
    async fn sleep_timer_pauses_at_the_deadline() {
        let mut provider = MockProvider::new();
        provider
            .expect_discover()
            .times(1)
            .returning(|_| Ok(Some(detail("t1", 1))));
        provider
            .expect_audio_renditions()
            .times(1)
            .returning(|_, _| Ok(ranked("https://cdn.example.com/t1.m4a")));

        let (element, tx) = permissive_element();
        let clock = Arc::new(TestClock(AtomicI64::new(1_000_000)));
        let player = Player::new(PlayerConfig {
            provider: Arc::new(provider),
            element: Arc::new(element),
            strategy: Arc::new(EagerPlayback),
            settings_store: Arc::new(MemoryStore::new()),
            proxy: Arc::new(IdentityProxy),
            clock: Arc::clone(&clock) as Arc<dyn Clock>,
            downloader: None,
            event_bus: EventBus::new(64),
            settings: PlayerSettings::default(),
        });

        player.fetch_and_play(FetchKind::Random).await.unwrap();
        tx.send(MediaElementEvent::CanPlayThrough).unwrap();
        tx.send(MediaElementEvent::Playing).unwrap();
        settle().await;

        player.set_sleep_timer(Some(1));
        clock.0.fetch_add(61_000, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(!player.session().is_playing);
        assert_eq!(player.settings().sleep_timer_deadline_ms, None);
    }

    #[tokio::test]
    async fn favorite_replay_re_resolves_the_stream() {
        let mut provider = MockProvider::new();
        provider
            .expect_track_detail()
            .times(1)
            .returning(|id| Ok(detail(id, 1)));
        provider
            .expect_audio_renditions()
            .times(1)
            .returning(|_, _| Ok(ranked("https://cdn.example.com/fresh.m4a")));

        let (element, _tx) = permissive_element();
        let player = player_with(provider, element);

        let favorite = Favorite {
            id: "t9".into(),
            title: "title-t9".into(),
            thumbnail_url: String::new(),
            duration_secs: 120,
            audio_url: Some("https://cdn.example.com/expired.m4a".into()),
            added_at_ms: 0,
        };
        player.play_favorite(&favorite).await.unwrap();
        settle().await;

        // The expired persisted URL is never loaded.
        assert_eq!(
            player.playlist()[0].audio_url.as_deref(),
            Some("https://cdn.example.com/fresh.m4a")
        );
    }

    #[tokio::test]
    async fn volume_changes_persist_and_feed_the_element() {
        let mut provider = MockProvider::new();
        provider.expect_discover().never();

        let (element, _tx) = permissive_element();
        let player = player_with(provider, element);

        player.set_volume(0.5).await.unwrap();
        assert!((player.settings().volume - 0.5).abs() < f32::EPSILON);

        player.toggle_mute().await.unwrap();
        assert!(player.settings().muted);

        player.toggle_mute().await.unwrap();
        assert!(!player.settings().muted);
        assert!((player.settings().volume - 0.5).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn download_without_current_track_is_an_error() {
        let provider = MockProvider::new();
        let (element, _tx) = permissive_element();
        let player = player_with(provider, element);

        let err = player.download_current().await.unwrap_err();
        assert!(matches!(err, PlayerError::NoCurrentTrack));
    }
}
