//! Artifact resolution against an ordered repository list.
//!
//! The local repository is consulted first; a miss walks the remote list in
//! priority order, streaming the first hit into the local layout so the next
//! run resolves without network access.

use anyhow::Result;
use reqwest::Client;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::coordinate::Coordinate;
use crate::downloader::download_file;
use crate::repository::{artifact_relative_path, LocalRepository, RemoteRepository};

/// Resolves an artifact to a local file.
///
/// Tries the local repository, then each remote in order. A transport error
/// or a miss on one repository moves on to the next; only when every
/// repository has been exhausted does resolution fail.
pub async fn resolve_artifact(
    client: &Client,
    coordinate: &Coordinate,
    version: &str,
    extension: &str,
    remotes: &[RemoteRepository],
    local: &LocalRepository,
) -> Result<PathBuf> {
    if let Some(cached) = local.find(coordinate, version, extension) {
        return Ok(cached);
    }

    let relative = artifact_relative_path(coordinate, version, extension);
    let dest = local.artifact_path(coordinate, version, extension);

    for remote in remotes {
        let url = format!("{}/{}", remote.url.trim_end_matches('/'), relative);
        match download_file(client, &url, &dest, |_| {}).await {
            Ok(_) => {
                info!("Resolved {} from repository '{}'", coordinate, remote.id);
                return Ok(dest);
            }
            Err(e) => {
                debug!("Repository '{}' did not yield {}: {}", remote.id, coordinate, e);
            }
        }
    }

    anyhow::bail!(
        "Artifact {}:{} (version {}) not found in local repository or any of {} remote repositories",
        coordinate,
        extension,
        version,
        remotes.len()
    )
}
