//! Download collaborator abstraction.
//!
//! The engine only supplies a resolved stream URL and a display name; the byte
//! transfer, destination handling and progress accounting belong to the host.
//! Progress is a plain 0-100 stream with an out-of-band failure sentinel so a
//! UI can render one bar without inspecting errors mid-flight.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::platform::PlatformSendSync;

/// What kind of payload is being fetched; decides the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadKind {
    Audio,
    Video,
}

impl DownloadKind {
    pub fn extension(&self) -> &'static str {
        match self {
            DownloadKind::Audio => ".m4a",
            DownloadKind::Video => ".mp4",
        }
    }
}

/// A single transfer request.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// Resolved (signed) source URL.
    pub url: String,
    /// Display name; the implementation sanitizes it into a file name.
    pub display_name: String,
    pub kind: DownloadKind,
    /// Target directory; `None` uses the host's default download location.
    pub destination: Option<PathBuf>,
    /// Optional sub-folder under the destination (used for collections).
    pub sub_folder: Option<String>,
}

/// Progress notifications for one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadProgress {
    /// Completed percentage, 0 through 100.
    Percent(u8),
    /// The transfer failed; carries a user-presentable message.
    Failed(String),
}

/// Performs byte transfers to disk.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait Downloader: PlatformSendSync {
    /// Transfer `request.url` to disk, reporting progress through `progress`.
    ///
    /// Returns the path of the written file. A send failure on the progress
    /// channel (listener went away) must not abort the transfer.
    async fn download(
        &self,
        request: DownloadRequest,
        progress: mpsc::UnboundedSender<DownloadProgress>,
    ) -> Result<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_maps_to_extension() {
        assert_eq!(DownloadKind::Audio.extension(), ".m4a");
        assert_eq!(DownloadKind::Video.extension(), ".mp4");
    }
}
