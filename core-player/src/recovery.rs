//! # Stream-Link Recovery
//!
//! Stream URLs are signed and expire; a long-paused session resumes into a
//! dead link. Recovery allows a bounded number of silent re-resolutions
//! before the failure is surfaced to the user.

use tracing::debug;

/// How many consecutive silent retries a failing stream gets. The failure
/// that would be retry number `MAX_STREAM_RETRIES + 1` surfaces instead.
pub const MAX_STREAM_RETRIES: u32 = 2;

/// Verdict for one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryDecision {
    /// Re-resolve and reload silently.
    Retry,
    /// Ceiling reached; surface the error.
    GiveUp,
}

/// Consecutive-failure counter with the retry ceiling.
#[derive(Debug, Default)]
pub struct RecoveryState {
    consecutive_failures: u32,
}

impl RecoveryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a recoverable failure and decide whether to retry.
    pub fn on_failure(&mut self) -> RecoveryDecision {
        self.consecutive_failures += 1;
        if self.consecutive_failures <= MAX_STREAM_RETRIES {
            debug!(
                attempt = self.consecutive_failures,
                ceiling = MAX_STREAM_RETRIES,
                "stream failure, retrying silently"
            );
            RecoveryDecision::Retry
        } else {
            debug!("stream retry ceiling reached, surfacing error");
            RecoveryDecision::GiveUp
        }
    }

    /// Reset on any successful playback start; the ceiling applies to
    /// consecutive failures only.
    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn failures(&self) -> u32 {
        self.consecutive_failures
    }
}
