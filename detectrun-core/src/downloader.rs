//! Streaming HTTP download with whole-percentage progress reporting.
//!
//! The response body is streamed to disk chunk by chunk; the progress
//! callback fires only when the integer percentage changes, so console
//! reporting stays readable for large archives. The connection is released
//! on every exit path when the response stream drops.

use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use std::time::Instant;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

/// Progress information during a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    /// Bytes downloaded so far.
    pub bytes_downloaded: u64,
    /// Total bytes expected, if the server sent a Content-Length.
    pub total_bytes: Option<u64>,
    /// Whole-number percentage (0..=100), or None if the total is unknown.
    pub percent: Option<u32>,
}

impl DownloadProgress {
    fn new(bytes_downloaded: u64, total_bytes: Option<u64>) -> Self {
        let percent = total_bytes.map(|total| {
            if total > 0 {
                ((bytes_downloaded as f64 / total as f64) * 100.0) as u32
            } else {
                0
            }
        });
        Self {
            bytes_downloaded,
            total_bytes,
            percent,
        }
    }
}

/// Downloads a file from a URL, streaming to `dest`.
///
/// The body is streamed to a `.part` sibling and renamed into place only
/// after the full body arrived, so `dest` either holds a complete download
/// or does not exist. The callback is invoked once at the start and
/// afterwards only when the whole percentage changes. Returns the number of
/// bytes written. Any transport error, non-success status, or write failure
/// is fatal.
pub async fn download_file<F>(client: &Client, url: &str, dest: &Path, progress_cb: F) -> Result<u64>
where
    F: Fn(DownloadProgress),
{
    let url = Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;
    debug!("Downloading {} to {}", url, dest.display());

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let started = Instant::now();
    let response = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("Failed to start download from {}", url))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("Download of {} failed with status {}", url, status.as_u16());
    }

    let part = partial_path(dest);
    let bytes_downloaded = match stream_body(response, &url, &part, &progress_cb).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e);
        }
    };

    tokio::fs::rename(&part, dest)
        .await
        .with_context(|| format!("Failed to move download into {}", dest.display()))?;

    info!(
        "Downloaded {} bytes to {} in {}s",
        bytes_downloaded,
        dest.display(),
        started.elapsed().as_secs()
    );

    Ok(bytes_downloaded)
}

fn partial_path(dest: &Path) -> std::path::PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

async fn stream_body<F>(
    response: reqwest::Response,
    url: &Url,
    part: &Path,
    progress_cb: &F,
) -> Result<u64>
where
    F: Fn(DownloadProgress),
{
    let total_bytes = response.content_length();
    debug!("Content-Length: {:?}", total_bytes);

    let mut file = File::create(part)
        .await
        .with_context(|| format!("Failed to create file: {}", part.display()))?;

    let mut stream = response.bytes_stream();
    let mut bytes_downloaded: u64 = 0;

    let initial = DownloadProgress::new(0, total_bytes);
    let mut last_percent = initial.percent;
    progress_cb(initial);

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.with_context(|| format!("Failed to read from {}", url))?;
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write to {}", part.display()))?;

        bytes_downloaded += chunk.len() as u64;
        let progress = DownloadProgress::new(bytes_downloaded, total_bytes);
        if progress.percent != last_percent {
            last_percent = progress.percent;
            progress_cb(progress);
        }
    }

    file.flush()
        .await
        .with_context(|| format!("Failed to flush {}", part.display()))?;

    Ok(bytes_downloaded)
}
