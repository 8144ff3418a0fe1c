//! Streaming file downloads via the bridge HTTP client
//!
//! Transfers a resolved stream URL to disk in chunks, reporting 0-100
//! progress as bytes arrive. Display names are sanitized into safe file
//! names; collections land in a sanitized sub-folder.

use async_trait::async_trait;
use bridge_traits::{
    download::{DownloadProgress, DownloadRequest, Downloader},
    error::{BridgeError, Result},
    http::HttpClient,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

/// Characters that cannot appear in file names on the supported platforms.
const INVALID_FILENAME_CHARS: &str = "<>:\"/\\|?*";

/// Read buffer size for disk writes.
const CHUNK_SIZE: usize = 64 * 1024;

/// Replace illegal file name characters with underscores.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if INVALID_FILENAME_CHARS.contains(c) { '_' } else { c })
        .collect()
}

/// Downloader that streams through the injected [`HttpClient`].
///
/// Progress sends are best-effort: a listener that went away never aborts
/// the transfer.
pub struct ReqwestDownloader {
    http_client: Arc<dyn HttpClient>,
    /// Default target when a request names no destination.
    default_dir: PathBuf,
}

impl ReqwestDownloader {
    pub fn new(http_client: Arc<dyn HttpClient>, default_dir: PathBuf) -> Self {
        Self {
            http_client,
            default_dir,
        }
    }

    /// Downloader writing into `<data dir>/<app_name>/downloads` by default.
    pub fn with_default_dir(http_client: Arc<dyn HttpClient>, app_name: &str) -> Result<Self> {
        let base = dirs::data_dir()
            .ok_or_else(|| BridgeError::NotAvailable("no data directory".to_string()))?;
        Ok(Self::new(http_client, base.join(app_name).join("downloads")))
    }

    fn target_path(&self, request: &DownloadRequest) -> PathBuf {
        let file_name = sanitize_filename(&request.display_name) + request.kind.extension();
        let mut dir = request
            .destination
            .clone()
            .unwrap_or_else(|| self.default_dir.clone());
        if let Some(folder) = &request.sub_folder {
            dir.push(sanitize_filename(folder));
        }
        dir.join(file_name)
    }
}

#[async_trait]
impl Downloader for ReqwestDownloader {
    #[instrument(skip(self, progress), fields(url = %request.url))]
    async fn download(
        &self,
        request: DownloadRequest,
        progress: mpsc::UnboundedSender<DownloadProgress>,
    ) -> Result<PathBuf> {
        let path = self.target_path(&request);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Content-Length first, so percentages have a denominator.
        let total_size = match self.http_client.execute(
            bridge_traits::http::HttpRequest::new(
                bridge_traits::http::HttpMethod::Get,
                request.url.clone(),
            )
            .header("Range", "bytes=0-0"),
        )
        .await
        {
            Ok(response) => response
                .headers
                .get("content-range")
                .and_then(|v| v.rsplit('/').next())
                .and_then(|len| len.parse::<u64>().ok())
                .unwrap_or(0),
            Err(_) => 0,
        };

        let mut reader = match self
            .http_client
            .download_stream(request.url.clone(), HashMap::new())
            .await
        {
            Ok(reader) => reader,
            Err(e) => {
                progress.send(DownloadProgress::Failed(e.to_string())).ok();
                return Err(e);
            }
        };

        let mut file = tokio::fs::File::create(&path).await?;
        let mut downloaded: u64 = 0;
        let mut last_percent: u8 = 0;
        let mut buf = vec![0u8; CHUNK_SIZE];

        progress.send(DownloadProgress::Percent(0)).ok();

        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    progress.send(DownloadProgress::Failed(e.to_string())).ok();
                    return Err(e.into());
                }
            };
            file.write_all(&buf[..n]).await?;
            downloaded += n as u64;

            if total_size > 0 {
                let percent = ((downloaded * 100) / total_size).min(100) as u8;
                if percent != last_percent {
                    last_percent = percent;
                    progress.send(DownloadProgress::Percent(percent)).ok();
                }
            }
        }
        file.flush().await?;

        progress.send(DownloadProgress::Percent(100)).ok();
        info!(path = %path.display(), bytes = downloaded, "download complete");
        debug!(total_size, "download accounting");
        Ok(path)
    }
}
