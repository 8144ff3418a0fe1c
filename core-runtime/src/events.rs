//! # Event Bus System
//!
//! Event-driven notification layer for the playback engine, built on
//! `tokio::sync::broadcast`. The engine publishes typed [`PlayerEvent`]s here;
//! front-end shells subscribe and mirror them into their own UI state.
//!
//! ## Overview
//!
//! - **[`PlayerEvent`]**: strongly-typed enum covering playlist, cursor,
//!   transport, and error notifications
//! - **[`EventBus`]**: central broadcast channel for publishing events
//! - **[`EventStream`]**: receiver wrapper with optional filtering
//!
//! ## Usage
//!
//! ### Publishing Events
//!
//! ```rust
//! use core_runtime::events::{EventBus, PlayerEvent};
//!
//! let event_bus = EventBus::new(100);
//! event_bus
//!     .emit(PlayerEvent::PlaybackStateChanged { playing: true })
//!     .ok();
//! ```
//!
//! ### Subscribing to Events
//!
//! ```rust
//! use core_runtime::events::EventBus;
//! use tokio::sync::broadcast::error::RecvError;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! tokio::spawn(async move {
//!     loop {
//!         match stream.recv().await {
//!             Ok(event) => println!("Received: {:?}", event),
//!             Err(RecvError::Lagged(n)) => eprintln!("Missed {} events", n),
//!             Err(RecvError::Closed) => break,
//!         }
//!     }
//! });
//! # }
//! ```
//!
//! ## Error Handling
//!
//! `tokio::sync::broadcast` can produce two receive errors:
//!
//! - **`RecvError::Lagged(n)`**: the subscriber was too slow and missed `n`
//!   events. Non-fatal; the subscriber keeps receiving new events.
//! - **`RecvError::Closed`**: all senders dropped. Treat as shutdown.
//!
//! ## Performance Considerations
//!
//! - Events are cloned per subscriber, so payloads stay lightweight (ids and
//!   scalars, never whole playlist snapshots).
//! - `TimeUpdate` is the highest-volume event (several per second during
//!   playback); size the buffer with that in mind.
//!
//! ## Thread Safety
//!
//! The event bus is `Send + Sync` and is typically shared via `Arc` between
//! the engine's dispatcher task and any number of subscriber tasks.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that fall behind by more than this receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Player Events
// ============================================================================

/// Events published by the playback engine.
///
/// Payloads are intentionally small: subscribers that need the full playlist
/// or track state pull it from the engine after a notification rather than
/// carrying it on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum PlayerEvent {
    /// Playlist membership changed (append, patch, or removal).
    PlaylistChanged {
        /// Number of entries after the change.
        len: usize,
    },
    /// The playback cursor moved to a different entry, or was cleared.
    CursorChanged {
        /// New cursor position, `None` when nothing is selected.
        index: Option<usize>,
    },
    /// Playback started or stopped.
    PlaybackStateChanged {
        /// Whether the transport is currently playing.
        playing: bool,
    },
    /// Playback position advanced (seek or natural progression).
    TimeUpdate {
        /// Current position in seconds.
        position_secs: f64,
        /// Known duration in seconds, 0.0 until metadata arrives.
        duration_secs: f64,
    },
    /// The engine entered or left a loading phase (resolve + buffer).
    LoadingChanged {
        /// Whether a load is in flight.
        loading: bool,
    },
    /// An unrecoverable playback error was surfaced to the session.
    ErrorRaised {
        /// Human-readable error message.
        message: String,
    },
    /// A previously surfaced error was cleared (new load or recovery).
    ErrorCleared,
    /// A new track (or part) began playing.
    TrackStarted {
        /// The track ID now playing.
        track_id: String,
        /// Track title for display.
        title: String,
    },
    /// A download advanced.
    DownloadProgress {
        /// Completed percentage, 0 through 100.
        percent: u8,
    },
    /// A download failed.
    DownloadFailed {
        /// Human-readable failure message.
        message: String,
    },
}

impl PlayerEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            PlayerEvent::PlaylistChanged { .. } => "Playlist changed",
            PlayerEvent::CursorChanged { .. } => "Cursor moved",
            PlayerEvent::PlaybackStateChanged { playing: true } => "Playback started",
            PlayerEvent::PlaybackStateChanged { playing: false } => "Playback paused",
            PlayerEvent::TimeUpdate { .. } => "Playback position changed",
            PlayerEvent::LoadingChanged { .. } => "Loading state changed",
            PlayerEvent::ErrorRaised { .. } => "Playback error",
            PlayerEvent::ErrorCleared => "Playback error cleared",
            PlayerEvent::TrackStarted { .. } => "Track started",
            PlayerEvent::DownloadProgress { .. } => "Download progressed",
            PlayerEvent::DownloadFailed { .. } => "Download failed",
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            PlayerEvent::ErrorRaised { .. } => EventSeverity::Error,
            PlayerEvent::DownloadFailed { .. } => EventSeverity::Error,
            PlayerEvent::TrackStarted { .. } => EventSeverity::Info,
            PlayerEvent::ErrorCleared => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to [`PlayerEvent`]s.
///
/// Uses `tokio::sync::broadcast` internally:
/// - multiple producers (clone the `EventBus`)
/// - multiple consumers (each `subscribe()` creates an independent receiver)
/// - non-blocking sends
/// - lagging detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// `capacity` is the maximum number of events buffered per subscriber;
    /// subscribers that fall further behind receive `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// when there are none. Callers that don't care whether anyone is
    /// listening (the common case for the engine) use `.ok()`.
    pub fn emit(&self, event: PlayerEvent) -> Result<usize, SendError<PlayerEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all future
    /// events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&PlayerEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// Useful for subscribers that only care about a subset of events, e.g. a
/// now-playing widget that ignores the high-frequency `TimeUpdate` stream:
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, PlayerEvent};
///
/// let event_bus = EventBus::new(100);
/// let stream = EventStream::new(event_bus.subscribe())
///     .filter(|event| !matches!(event, PlayerEvent::TimeUpdate { .. }));
/// ```
pub struct EventStream {
    receiver: Receiver<PlayerEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<PlayerEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&PlayerEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n`
    /// events, `RecvError::Closed` when all senders have been dropped.
    pub async fn recv(&mut self) -> Result<PlayerEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` when no matching event is currently available.
    pub fn try_recv(&mut self) -> Option<Result<PlayerEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_creation() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(PlayerEvent::ErrorCleared).is_err());
    }

    #[tokio::test]
    async fn test_event_emission_with_subscribers() {
        let bus = EventBus::new(10);
        let mut sub = bus.subscribe();

        let event = PlayerEvent::TrackStarted {
            track_id: "BV1xx411c7mD".to_string(),
            title: "济公传".to_string(),
        };

        let result = bus.emit(event.clone());
        assert_eq!(result.unwrap(), 1);

        let received = sub.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = PlayerEvent::CursorChanged { index: Some(3) };
        bus.emit(event.clone()).ok();

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| !matches!(event, PlayerEvent::TimeUpdate { .. }));

        // High-frequency event should be filtered out
        bus.emit(PlayerEvent::TimeUpdate {
            position_secs: 12.5,
            duration_secs: 300.0,
        })
        .ok();

        let wanted = PlayerEvent::PlaybackStateChanged { playing: true };
        bus.emit(wanted.clone()).ok();

        let received = stream.recv().await.unwrap();
        assert_eq!(received, wanted);
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2); // Very small buffer
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(PlayerEvent::PlaylistChanged { len: i }).ok();
        }

        let result = sub.recv().await;
        assert!(matches!(result, Err(RecvError::Lagged(_))));
    }

    #[tokio::test]
    async fn test_event_severity() {
        let error_event = PlayerEvent::ErrorRaised {
            message: "stream unreachable".to_string(),
        };
        assert_eq!(error_event.severity(), EventSeverity::Error);

        let started = PlayerEvent::TrackStarted {
            track_id: "BV1".to_string(),
            title: "t".to_string(),
        };
        assert_eq!(started.severity(), EventSeverity::Info);

        let tick = PlayerEvent::TimeUpdate {
            position_secs: 1.0,
            duration_secs: 2.0,
        };
        assert_eq!(tick.severity(), EventSeverity::Debug);
    }

    #[tokio::test]
    async fn test_event_description() {
        let event = PlayerEvent::PlaybackStateChanged { playing: false };
        assert_eq!(event.description(), "Playback paused");
    }

    #[tokio::test]
    async fn test_event_serialization() {
        let event = PlayerEvent::CursorChanged { index: None };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("CursorChanged"));

        let deserialized: PlayerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());
        assert!(stream.try_recv().is_none());
    }
}
