//! # Transport Error Types
//!
//! Error types for the media transport, including the classification of
//! platform media-element error codes into retryable and terminal failures.

use thiserror::Error;

/// Classified media failure, derived from the numeric error codes platform
/// media elements report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The load was aborted, usually because the source was torn down on
    /// purpose (track switch, playlist cleared). Benign.
    Aborted,
    /// A network failure interrupted the download of the stream.
    NetworkFailure,
    /// The stream was fetched but could not be decoded.
    DecodeFailure,
    /// The source URL or container format is not playable. In practice this
    /// is what an expired CDN link looks like.
    SourceUnsupported,
    /// An error code outside the known 1-4 range.
    Unknown(u32),
}

impl ErrorKind {
    /// Maps a platform media error code to its classification.
    ///
    /// Codes follow the HTML media element convention:
    /// 1 = aborted, 2 = network, 3 = decode, 4 = source not supported.
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => ErrorKind::Aborted,
            2 => ErrorKind::NetworkFailure,
            3 => ErrorKind::DecodeFailure,
            4 => ErrorKind::SourceUnsupported,
            other => ErrorKind::Unknown(other),
        }
    }

    /// Whether a fresh stream link is worth fetching after this failure.
    ///
    /// Network failures and unsupported sources are both typical symptoms of
    /// an expired CDN URL, so both are considered recoverable. Decode
    /// failures indicate a broken stream that a new link won't fix.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ErrorKind::NetworkFailure | ErrorKind::SourceUnsupported)
    }

    /// Whether this failure is an expected side effect of tearing down a
    /// source (no source loaded, or an explicit abort) rather than a real
    /// playback problem.
    pub fn is_benign_teardown(&self) -> bool {
        matches!(self, ErrorKind::Aborted)
    }

    /// Human-readable label used in surfaced error messages.
    pub fn describe(&self) -> String {
        match self {
            ErrorKind::Aborted => "playback aborted".to_string(),
            ErrorKind::NetworkFailure => "network error while streaming".to_string(),
            ErrorKind::DecodeFailure => "audio stream could not be decoded".to_string(),
            ErrorKind::SourceUnsupported => "stream link rejected by player".to_string(),
            ErrorKind::Unknown(code) => format!("unknown media error (code {})", code),
        }
    }
}

/// Errors that can occur during transport operations.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The underlying media element reported a failure.
    #[error("Media element failure: {}", .0.describe())]
    Media(ErrorKind),

    /// A control operation reached the platform layer and failed there.
    #[error("Platform bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),

    /// An operation that needs a loaded source was called with none.
    #[error("No source loaded")]
    NoSource,
}

impl TransportError {
    /// Returns `true` if a retry with a fresh stream link may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            TransportError::Media(kind) => kind.is_recoverable(),
            TransportError::Bridge(_) => false,
            TransportError::NoSource => false,
        }
    }
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;
