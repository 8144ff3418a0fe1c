//! # Player Error Types

use thiserror::Error;

/// Errors that can occur in the playback engine.
#[derive(Error, Debug)]
pub enum PlayerError {
    /// The playback endpoint reported nothing playable for a track/part.
    #[error("No playable audio source for {track_id}")]
    NoPlayableSource { track_id: String },

    /// An index pointed outside the playlist.
    #[error("Playlist index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Nothing is selected for an operation that needs a current track.
    #[error("No current track")]
    NoCurrentTrack,

    /// The provider or another platform collaborator failed.
    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),

    /// The transport failed outside its own recovery.
    #[error("Transport error: {0}")]
    Transport(#[from] core_playback::TransportError),

    /// Persisted state could not be read or written.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, PlayerError>;
