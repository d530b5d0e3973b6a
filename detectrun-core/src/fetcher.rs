//! Cache-or-fetch for the detect jar and the scan-cli archive.
//!
//! Both fetch paths are idempotent against a populated cache: an existing
//! cache file short-circuits all network work except version resolution,
//! which later feeds the flag-emission capability check. Fallbacks are
//! explicit ordered sequences, not nested handlers: the detect jar tries a
//! two-entry coordinate table, scan-cli falls back from local resolution to
//! a direct HTTP download.

use anyhow::{Context, Result};
use reqwest::Client;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::coordinate::{resolve_version, Coordinate};
use crate::downloader::download_file;
use crate::repository::{LocalRepository, RemoteRepository};
use crate::resolver::resolve_artifact;
use crate::settings::DetectSettings;

/// Ensures the detect jar is cached locally; returns the cache path and the
/// resolved tool version.
///
/// On a cache miss, the configured coordinates are tried first and the
/// fixed legacy coordinates second; both failing is fatal and names the
/// configured coordinates.
pub async fn fetch_detect_jar(
    client: &Client,
    settings: &DetectSettings,
    repositories: &[RemoteRepository],
    local: &LocalRepository,
) -> Result<(PathBuf, String)> {
    let coordinate: Coordinate = settings.executable_gav.parse()?;
    let version = resolve_version(
        client,
        &coordinate,
        &settings.latest_version_url,
        &settings.artifactory_base,
        &settings.artifact_repository_name,
    )
    .await;

    let cache = settings.detect_cache_path();
    if cache.exists() {
        debug!("Detect jar already cached at {}", cache.display());
        return Ok((cache, version));
    }

    let legacy = Coordinate::legacy_detect();
    let legacy_version = legacy.version.clone();
    let attempts = [(coordinate, version.clone()), (legacy, legacy_version)];

    let mut last_error = None;
    for (i, (attempt, attempt_version)) in attempts.iter().enumerate() {
        if i > 0 {
            info!(
                "Using old blackduck hub-detect coordinates because {} was not found",
                settings.executable_gav
            );
        }
        match resolve_artifact(client, attempt, attempt_version, "jar", repositories, local).await {
            Ok(file) => {
                if let Some(parent) = cache.parent() {
                    tokio::fs::create_dir_all(parent).await.with_context(|| {
                        format!("Failed to create directory: {}", parent.display())
                    })?;
                }
                tokio::fs::copy(&file, &cache).await.with_context(|| {
                    format!("Failed to copy {} to {}", file.display(), cache.display())
                })?;
                return Ok((cache, version));
            }
            Err(e) => {
                debug!("Attempt {} for detect jar failed: {}", i + 1, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.expect("at least one attempt ran"))
        .with_context(|| format!("Didn't find '{}'", settings.executable_gav))
}

/// Ensures the scan-cli zip is cached locally; returns the cache path.
///
/// Resolution goes against the local repository only (no remote list); a
/// miss, a failure, or the force flag falls back to a direct download. A
/// freshly downloaded archive is published into the local repository under
/// the resolved coordinates so the next run resolves it normally.
pub async fn fetch_scan_cli(
    client: &Client,
    settings: &DetectSettings,
    version: &str,
    local: &LocalRepository,
) -> Result<PathBuf> {
    let coordinate: Coordinate = settings.scan_cli_gav.parse()?;

    let cache = settings.scan_cli_cache_path();
    if cache.exists() {
        debug!("scan-cli already cached at {}", cache.display());
        return Ok(cache);
    }

    let (zip, downloaded) = if settings.force_scan_cli_download {
        (download_scan_cli(client, settings).await?, true)
    } else {
        match resolve_artifact(client, &coordinate, version, "zip", &[], local).await {
            Ok(file) => (file, false),
            Err(e) => {
                debug!("scan-cli resolution failed, downloading instead: {}", e);
                (download_scan_cli(client, settings).await?, true)
            }
        }
    };

    if downloaded {
        local.publish(&zip, &coordinate, version, "zip")?;
    }

    if let Some(parent) = cache.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    tokio::fs::copy(&zip, &cache)
        .await
        .with_context(|| format!("Failed to copy {} to {}", zip.display(), cache.display()))?;
    Ok(cache)
}

async fn download_scan_cli(client: &Client, settings: &DetectSettings) -> Result<PathBuf> {
    info!("Downloading scan.cli.zip, can take some time...");
    let dest = settings.scratch_dir().join("scan.cli.zip");
    download_file(client, &settings.scan_cli_download_url, &dest, |progress| {
        if let Some(percent) = progress.percent {
            info!("Downloading scan.cli.zip - {}%", percent);
        }
    })
    .await?;
    Ok(dest)
}
