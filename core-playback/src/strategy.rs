//! # Readiness Strategies
//!
//! Policies deciding when a freshly loaded source has buffered enough for
//! playback to begin. The transport holds one strategy and consults it after
//! every `load()`; swapping the strategy changes startup behavior without
//! touching the transport itself.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::media::{MediaElement, MediaElementEvent};
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tracing::{debug, trace};

use crate::error::{ErrorKind, Result, TransportError};

/// Minimum buffered runway before gated playback starts.
pub const MIN_BUFFERED_AHEAD: Duration = Duration::from_secs(3);

/// Interval between buffer polls while gating.
pub const BUFFER_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Settle delay after the first data arrives, letting the element's buffer
/// ranges stabilize before the first poll.
pub const BUFFER_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Decides when a loaded source is ready for playback to start.
///
/// Implementations consume the element's event stream and return once the
/// source is playable, or with an error if the element fails while waiting.
#[async_trait]
pub trait ReadinessStrategy: Send + Sync {
    /// Waits until the element's current source is ready to play.
    ///
    /// The caller is responsible for cancellation: it drops the future when a
    /// newer load supersedes this one.
    async fn wait_ready(
        &self,
        element: Arc<dyn MediaElement>,
        events: &mut Receiver<MediaElementEvent>,
    ) -> Result<()>;

    /// Strategy name for logging.
    fn name(&self) -> &'static str;
}

/// Awaits the next occurrence of `event` on the stream, failing fast when the
/// element reports an error. Lagged receivers skip ahead and keep waiting.
async fn await_event(
    events: &mut Receiver<MediaElementEvent>,
    wanted: fn(&MediaElementEvent) -> bool,
) -> Result<()> {
    loop {
        match events.recv().await {
            Ok(event) if wanted(&event) => return Ok(()),
            Ok(MediaElementEvent::Error { code }) => {
                return Err(TransportError::Media(ErrorKind::from_code(code)));
            }
            Ok(_) => continue,
            Err(RecvError::Lagged(n)) => {
                trace!(missed = n, "readiness wait lagged behind element events");
                continue;
            }
            Err(RecvError::Closed) => {
                return Err(TransportError::Media(ErrorKind::Aborted));
            }
        }
    }
}

// ============================================================================
// Eager Playback
// ============================================================================

/// Starts playback as soon as the element signals it can play through.
///
/// The default strategy for desktop-class connections where the element's own
/// readahead estimate is trustworthy.
#[derive(Debug, Default, Clone, Copy)]
pub struct EagerPlayback;

#[async_trait]
impl ReadinessStrategy for EagerPlayback {
    async fn wait_ready(
        &self,
        _element: Arc<dyn MediaElement>,
        events: &mut Receiver<MediaElementEvent>,
    ) -> Result<()> {
        await_event(events, |e| matches!(e, MediaElementEvent::CanPlayThrough)).await
    }

    fn name(&self) -> &'static str {
        "eager"
    }
}

// ============================================================================
// Buffer-Gated Playback
// ============================================================================

/// Holds playback until a minimum buffer runway has accumulated.
///
/// Waits for the first data to arrive, pauses briefly so the element's buffer
/// ranges settle, then polls until either the buffered runway ahead of the
/// playhead reaches [`MIN_BUFFERED_AHEAD`] or the element itself reports it
/// has enough data. Short tracks that buffer completely satisfy the second
/// condition before the first.
///
/// Intended for constrained or metered networks where starting on the first
/// ready signal causes immediate stalls.
#[derive(Debug, Clone, Copy)]
pub struct BufferGatedPlayback {
    min_buffered: Duration,
    poll_interval: Duration,
    settle_delay: Duration,
}

impl Default for BufferGatedPlayback {
    fn default() -> Self {
        Self {
            min_buffered: MIN_BUFFERED_AHEAD,
            poll_interval: BUFFER_POLL_INTERVAL,
            settle_delay: BUFFER_SETTLE_DELAY,
        }
    }
}

impl BufferGatedPlayback {
    /// Creates a gate with custom thresholds, mainly for tests.
    pub fn with_thresholds(
        min_buffered: Duration,
        poll_interval: Duration,
        settle_delay: Duration,
    ) -> Self {
        Self {
            min_buffered,
            poll_interval,
            settle_delay,
        }
    }
}

#[async_trait]
impl ReadinessStrategy for BufferGatedPlayback {
    async fn wait_ready(
        &self,
        element: Arc<dyn MediaElement>,
        events: &mut Receiver<MediaElementEvent>,
    ) -> Result<()> {
        await_event(events, |e| matches!(e, MediaElementEvent::LoadedData)).await?;

        tokio::time::sleep(self.settle_delay).await;

        loop {
            let buffered = element.buffered_ahead().await?;
            if buffered >= self.min_buffered {
                debug!(buffered_ms = buffered.as_millis() as u64, "buffer gate open");
                return Ok(());
            }
            if element.has_enough_data().await? {
                debug!("element reports enough data, opening gate early");
                return Ok(());
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    fn name(&self) -> &'static str {
        "buffer-gated"
    }
}

// ============================================================================
// Tests
// ============================================================================
