//! # Core Player
//!
//! The playback-and-playlist state engine. Owns the playlist with its cursor,
//! the per-session transport state mirror, quality-aware stream resolution,
//! track-ended continuation across the four play modes, and bounded recovery
//! from expired stream links.
//!
//! ## Architecture
//!
//! ```text
//!           ┌────────────────────── Player ──────────────────────┐
//!           │  PlaylistStore   SessionState   PlayerSettings     │
//!           │       │               │              │             │
//!           │  TrackResolver   Continuation   RecoveryState      │
//!           └───────┬───────────────┬──────────────┬─────────────┘
//!                   │               │ TransportEvent dispatcher
//!            MediaProvider     MediaTransport ── MediaElement
//! ```
//!
//! All reactions to transport events run in one dispatcher task; entry points
//! mutate state behind a single lock, so the playlist can never be observed
//! mid-transition.

pub mod continuation;
pub mod engine;
pub mod error;
pub mod favorites;
pub mod models;
pub mod playlist;
pub mod recovery;
pub mod resolver;
pub mod settings;

pub use continuation::{next_action, ContinuationAction};
pub use engine::{FetchKind, Player, PlayerConfig, SessionState};
pub use error::{PlayerError, Result};
pub use models::{Favorite, Part, Track, TrackPatch};
pub use playlist::{PlaylistStore, RemoveOutcome};
pub use recovery::{RecoveryDecision, RecoveryState, MAX_STREAM_RETRIES};
pub use resolver::{ResolvedSource, TrackResolver};
pub use settings::{AudioQuality, PlayMode, PlayerSettings};
