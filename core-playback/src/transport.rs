//! # Media Transport
//!
//! Drives the platform media element on behalf of the engine. The transport
//! owns two invariants the rest of the engine depends on:
//!
//! 1. **Load supersession.** Every `load()` bumps a generation counter and
//!    the readiness gate it spawns re-checks that counter before starting
//!    playback. A slow load that finishes after a newer one can never seize
//!    the element.
//! 2. **Typed event delivery.** Raw element callbacks are classified and
//!    re-emitted as [`TransportEvent`]s over a single channel, so all state
//!    mutation happens in the engine's dispatcher, never inside a callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::media::{MediaElement, MediaElementEvent};
use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{debug, instrument, trace, warn};

use crate::error::{ErrorKind, Result};
use crate::strategy::ReadinessStrategy;

/// Coarse transport lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    /// No source loaded.
    #[default]
    Idle,
    /// Source assignment in progress.
    Loading,
    /// Source assigned, readiness gate waiting for playable data.
    Buffering,
    /// Playback running.
    Playing,
    /// Playback paused (or ended).
    Paused,
    /// The element reported a real failure.
    Error,
}

/// Events the transport delivers to the engine's dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Playback started or resumed.
    Playing,
    /// Playback paused.
    Paused,
    /// The current source played to its natural end.
    Ended,
    /// Playback position advanced.
    TimeUpdate { position: Duration },
    /// Total duration became known.
    DurationKnown { duration: Duration },
    /// The element failed with a classified, non-benign error.
    Errored { kind: ErrorKind },
}

/// Transport over one injected media element.
///
/// Cheap to clone; clones share the element, generation counter, and event
/// channel.
#[derive(Clone)]
pub struct MediaTransport {
    element: Arc<dyn MediaElement>,
    strategy: Arc<dyn ReadinessStrategy>,
    generation: Arc<AtomicU64>,
    state: Arc<Mutex<TransportState>>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
}

impl MediaTransport {
    /// Creates a transport and spawns its event pump.
    ///
    /// Returns the transport together with the receiving end of its event
    /// channel; the engine's dispatcher consumes it.
    pub fn new(
        element: Arc<dyn MediaElement>,
        strategy: Arc<dyn ReadinessStrategy>,
    ) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let transport = Self {
            element,
            strategy,
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(Mutex::new(TransportState::Idle)),
            events_tx,
        };

        transport.spawn_event_pump();
        (transport, events_rx)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TransportState {
        *self.state.lock()
    }

    /// Current load generation. Mostly useful for diagnostics.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Assigns a new source and schedules playback once it is ready.
    ///
    /// Returns as soon as the source is assigned; the readiness gate runs in
    /// a spawned task so callers never block on buffering. A subsequent
    /// `load()` or [`clear`](Self::clear) supersedes the pending gate.
    #[instrument(skip(self), fields(gen))]
    pub async fn load(&self, url: &str, rate: f32) -> Result<()> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::Span::current().record("gen", generation);
        debug!("loading source");

        *self.state.lock() = TransportState::Loading;

        // Stop the outgoing source before the swap so no audio overlaps.
        // An element with nothing loaded may reject either call.
        if let Err(e) = self.element.pause().await {
            warn!(error = %e, "pause before source swap failed");
        }
        if let Err(e) = self.element.set_position(Duration::ZERO).await {
            warn!(error = %e, "position reset before source swap failed");
        }

        // Subscribe before assigning the source so the gate cannot miss the
        // element's first readiness events.
        let mut events = self.element.events();
        self.element.set_source(url).await?;
        *self.state.lock() = TransportState::Buffering;

        let element = Arc::clone(&self.element);
        let strategy = Arc::clone(&self.strategy);
        let counter = Arc::clone(&self.generation);
        let state = Arc::clone(&self.state);
        let events_tx = self.events_tx.clone();

        tokio::spawn(async move {
            let ready = strategy.wait_ready(Arc::clone(&element), &mut events).await;

            if counter.load(Ordering::SeqCst) != generation {
                trace!(gen = generation, "readiness gate superseded, discarding");
                return;
            }

            match ready {
                Ok(()) => {
                    if let Err(e) = element.set_playback_rate(rate).await {
                        warn!(error = %e, "failed to apply playback rate");
                    }
                    if let Err(e) = element.play().await {
                        warn!(error = %e, "play after readiness gate failed");
                        *state.lock() = TransportState::Error;
                        events_tx
                            .send(TransportEvent::Errored {
                                kind: ErrorKind::Unknown(0),
                            })
                            .ok();
                    }
                }
                Err(e) => {
                    warn!(error = %e, gen = generation, "readiness gate failed");
                    if let crate::error::TransportError::Media(kind) = e {
                        if !kind.is_benign_teardown() {
                            *state.lock() = TransportState::Error;
                            events_tx.send(TransportEvent::Errored { kind }).ok();
                        }
                    }
                }
            }
        });

        Ok(())
    }

    /// Resumes playback of the current source.
    pub async fn play(&self) -> Result<()> {
        self.element.play().await?;
        Ok(())
    }

    /// Pauses playback, keeping source and position.
    pub async fn pause(&self) -> Result<()> {
        self.element.pause().await?;
        Ok(())
    }

    /// Seeks to an absolute position.
    pub async fn seek(&self, position: Duration) -> Result<()> {
        self.element.set_position(position).await?;
        Ok(())
    }

    /// Sets volume in `0.0..=1.0`.
    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        self.element.set_volume(volume).await?;
        Ok(())
    }

    /// Sets the playback rate.
    pub async fn set_playback_rate(&self, rate: f32) -> Result<()> {
        self.element.set_playback_rate(rate).await?;
        Ok(())
    }

    /// Tears down the current source and cancels any pending readiness gate.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.state.lock() = TransportState::Idle;
        self.element.clear_source().await?;
        Ok(())
    }

    /// Spawns the task that maps raw element events into transport events.
    fn spawn_event_pump(&self) {
        let mut events = self.element.events();
        let element = Arc::clone(&self.element);
        let state = Arc::clone(&self.state);
        let events_tx = self.events_tx.clone();

        tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(n)) => {
                        warn!(missed = n, "transport event pump lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                let mapped = match event {
                    MediaElementEvent::Playing => {
                        *state.lock() = TransportState::Playing;
                        Some(TransportEvent::Playing)
                    }
                    MediaElementEvent::Paused => {
                        *state.lock() = TransportState::Paused;
                        Some(TransportEvent::Paused)
                    }
                    MediaElementEvent::Ended => {
                        *state.lock() = TransportState::Paused;
                        Some(TransportEvent::Ended)
                    }
                    MediaElementEvent::TimeUpdate { position } => {
                        Some(TransportEvent::TimeUpdate { position })
                    }
                    MediaElementEvent::LoadedMetadata { duration } => {
                        Some(TransportEvent::DurationKnown { duration })
                    }
                    MediaElementEvent::Error { code } => {
                        let kind = ErrorKind::from_code(code);
                        if kind.is_benign_teardown() {
                            trace!(?kind, "ignoring teardown error");
                            None
                        } else if matches!(element.current_source().await, Ok(None)) {
                            // Errors raised with no source assigned are
                            // teardown residue, not playback failures.
                            trace!(?kind, "ignoring error with no source loaded");
                            None
                        } else {
                            *state.lock() = TransportState::Error;
                            Some(TransportEvent::Errored { kind })
                        }
                    }
                    MediaElementEvent::LoadedData | MediaElementEvent::CanPlayThrough => None,
                };

                if let Some(event) = mapped {
                    if events_tx.send(event).is_err() {
                        break;
                    }
                }
            }
            debug!("transport event pump stopped");
        });
    }
}

impl std::fmt::Debug for MediaTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaTransport")
            .field("state", &self.state())
            .field("generation", &self.generation())
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
