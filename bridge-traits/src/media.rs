//! Media element bridge trait.
//!
//! The host owns exactly one playable media element (an HTML5 audio element in
//! webview hosts, an OS player elsewhere). The transport in `core-playback`
//! drives it through this trait and reacts to its event stream; nothing else
//! in the engine touches the element. Injecting it here, instead of reaching
//! for a process-wide singleton, is what lets the whole engine run against a
//! scripted double in tests.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::platform::PlatformSendSync;

/// Events the media element raises as playback progresses.
///
/// These mirror the host element's lifecycle callbacks one-to-one; the
/// transport classifies and re-emits them as typed transport events so store
/// mutation never happens inside an element callback.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaElementEvent {
    /// First frame of media data has been decoded.
    LoadedData,
    /// Stream metadata is known, including total duration.
    LoadedMetadata { duration: Duration },
    /// The element estimates it can play to the end without stalling.
    CanPlayThrough,
    /// Playback position advanced (or was seeked).
    TimeUpdate { position: Duration },
    /// Playback is running.
    Playing,
    /// Playback was paused.
    Paused,
    /// The current source played to its natural end.
    Ended,
    /// The element failed. `code` carries the host media-error code:
    /// 1 = fetch aborted, 2 = network failure, 3 = decode failure,
    /// 4 = source not supported.
    Error { code: u32 },
}

/// The single playable element the host provides.
///
/// Implementations must tolerate control calls in any state (pausing an idle
/// element is a no-op, not an error); the transport relies on that when
/// tearing down a source.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait MediaElement: PlatformSendSync {
    /// Assign a new source URL. Does not start playback.
    async fn set_source(&self, url: &str) -> Result<()>;

    /// Drop the current source entirely, releasing any network connection.
    async fn clear_source(&self) -> Result<()>;

    /// Begin or resume playback of the current source.
    async fn play(&self) -> Result<()>;

    /// Pause playback, keeping the source and position.
    async fn pause(&self) -> Result<()>;

    /// Seek to an absolute position.
    async fn set_position(&self, position: Duration) -> Result<()>;

    /// Set volume in `0.0..=1.0`.
    async fn set_volume(&self, volume: f32) -> Result<()>;

    /// Set the playback rate (1.0 = normal speed).
    async fn set_playback_rate(&self, rate: f32) -> Result<()>;

    /// How much media is buffered ahead of the current position.
    async fn buffered_ahead(&self) -> Result<Duration>;

    /// Whether the element reports enough data to play through without
    /// further buffering.
    async fn has_enough_data(&self) -> Result<bool>;

    /// The currently assigned source URL, if any.
    async fn current_source(&self) -> Result<Option<String>>;

    /// Subscribe to the element's event stream.
    ///
    /// Each call returns an independent receiver; events are broadcast to all
    /// of them.
    fn events(&self) -> broadcast::Receiver<MediaElementEvent>;
}
