//! Error types for the Bilibili provider

use thiserror::Error;

/// Bilibili provider errors
#[derive(Error, Debug)]
pub enum BilibiliError {
    /// API responded with a non-zero business code
    #[error("Bilibili API error (code {code}): {message}")]
    ApiError { code: i64, message: String },

    /// HTTP layer returned a non-success status
    #[error("Bilibili HTTP error (status {status_code})")]
    HttpError { status_code: u16 },

    /// Track does not exist or is no longer available
    #[error("Track not found: {track_id}")]
    TrackNotFound { track_id: String },

    /// Playback endpoint returned nothing playable
    #[error("No playable audio stream for {track_id}/{part_id}")]
    NoAudioStream { track_id: String, part_id: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] bridge_traits::error::BridgeError),
}

/// Result type for Bilibili operations
pub type Result<T> = std::result::Result<T, BilibiliError>;

impl From<BilibiliError> for bridge_traits::error::BridgeError {
    fn from(error: BilibiliError) -> Self {
        match error {
            BilibiliError::ApiError { code, message } => {
                bridge_traits::error::BridgeError::OperationFailed(format!(
                    "Bilibili API error (code {}): {}",
                    code, message
                ))
            }
            BilibiliError::HttpError { status_code } => {
                bridge_traits::error::BridgeError::OperationFailed(format!(
                    "Bilibili HTTP error (status {})",
                    status_code
                ))
            }
            BilibiliError::TrackNotFound { track_id } => {
                bridge_traits::error::BridgeError::NotAvailable(format!(
                    "Track not found: {}",
                    track_id
                ))
            }
            BilibiliError::NoAudioStream { track_id, part_id } => {
                bridge_traits::error::BridgeError::NotAvailable(format!(
                    "No playable audio stream for {}/{}",
                    track_id, part_id
                ))
            }
            BilibiliError::ParseError(msg) => {
                bridge_traits::error::BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            BilibiliError::BridgeError(e) => e,
        }
    }
}
