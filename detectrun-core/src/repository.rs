//! Repository model: remote endpoints and the local Maven-layout store.
//!
//! Remote repositories are tried in list order; the list is always the
//! configured artifactory repository followed by the repositories the
//! enclosing project declares. The local repository is a directory in
//! standard Maven2 layout that doubles as the publish target for freshly
//! downloaded artifacts.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::coordinate::Coordinate;

/// Identifier of the synthesized primary repository.
const PRIMARY_REPOSITORY_ID: &str = "blackduck";

/// A remote repository endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRepository {
    pub id: String,
    pub url: String,
}

impl RemoteRepository {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

/// Synthesizes the prioritized repository list: the configured artifactory
/// repository first, then every project-declared repository in order.
pub fn repository_list(
    artifactory_base: &str,
    repository_name: &str,
    project_repositories: &[RemoteRepository],
) -> Vec<RemoteRepository> {
    let mut repositories = Vec::with_capacity(project_repositories.len() + 1);
    repositories.push(RemoteRepository::new(
        PRIMARY_REPOSITORY_ID,
        format!("{}/{}", artifactory_base.trim_end_matches('/'), repository_name),
    ));
    repositories.extend(project_repositories.iter().cloned());
    repositories
}

/// Relative Maven2 path of an artifact:
/// `group/as/dirs/artifact/version/artifact-version.ext`.
pub fn artifact_relative_path(coordinate: &Coordinate, version: &str, extension: &str) -> String {
    format!(
        "{}/{}/{}/{}-{}.{}",
        coordinate.group.replace('.', "/"),
        coordinate.artifact,
        version,
        coordinate.artifact,
        version,
        extension
    )
}

/// The build's local artifact store (Maven2 directory layout).
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path an artifact occupies in this repository.
    pub fn artifact_path(&self, coordinate: &Coordinate, version: &str, extension: &str) -> PathBuf {
        self.root
            .join(artifact_relative_path(coordinate, version, extension))
    }

    /// Returns the stored file if present.
    pub fn find(&self, coordinate: &Coordinate, version: &str, extension: &str) -> Option<PathBuf> {
        let path = self.artifact_path(coordinate, version, extension);
        if path.exists() {
            debug!("Found {} in local repository at {}", coordinate, path.display());
            Some(path)
        } else {
            None
        }
    }

    /// Copies a file into the repository layout under the given coordinates,
    /// so future runs resolve it without re-downloading.
    pub fn publish(
        &self,
        file: &Path,
        coordinate: &Coordinate,
        version: &str,
        extension: &str,
    ) -> Result<PathBuf> {
        let dest = self.artifact_path(coordinate, version, extension);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::copy(file, &dest).with_context(|| {
            format!(
                "Failed to publish {} to local repository at {}",
                file.display(),
                dest.display()
            )
        })?;
        debug!("Published {}:{} to {}", coordinate, extension, dest.display());
        Ok(dest)
    }
}
