//! Artifact coordinates and version resolution.
//!
//! A coordinate is a `group:artifact:version` triple identifying a
//! downloadable artifact. The version may be the literal token `latest`,
//! in which case it is resolved against the artifactory latest-version
//! endpoint before use.

use reqwest::Client;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

/// Coordinates detect shipped under before the Synopsys rename. Used as the
/// fallback when the configured coordinates cannot be resolved.
pub const LEGACY_DETECT_GAV: &str = "com.blackducksoftware.integration:hub-detect:5.2.0";

#[derive(Debug, Error)]
pub enum CoordinateError {
    #[error("Invalid coordinates '{0}', expected group:artifact:version")]
    Malformed(String),
}

/// A `group:artifact:version` triple. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinate {
    pub group: String,
    pub artifact: String,
    pub version: String,
}

impl Coordinate {
    /// The fixed legacy fallback coordinate.
    pub fn legacy_detect() -> Self {
        LEGACY_DETECT_GAV
            .parse()
            .expect("legacy coordinate constant is well-formed")
    }

    /// True when the version token is the literal `latest` (any case).
    pub fn is_latest(&self) -> bool {
        self.version.eq_ignore_ascii_case("latest")
    }
}

impl FromStr for Coordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(group), Some(artifact), Some(version), None)
                if !group.is_empty() && !artifact.is_empty() && !version.is_empty() =>
            {
                Ok(Self {
                    group: group.to_string(),
                    artifact: artifact.to_string(),
                    version: version.to_string(),
                })
            }
            _ => Err(CoordinateError::Malformed(s.to_string())),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)
    }
}

/// Fills a `%s`-templated latest-version URL. Substitution order is fixed:
/// repository base, group, artifact, repository name.
pub fn latest_version_url(template: &str, base: &str, group: &str, artifact: &str, repo: &str) -> String {
    let mut out = template.to_string();
    for value in [base, group, artifact, repo] {
        if let Some(pos) = out.find("%s") {
            out.replace_range(pos..pos + 2, value);
        }
    }
    out
}

/// Resolves a coordinate's version to a concrete string.
///
/// A concrete version is returned unchanged with no network access. The
/// `latest` token is resolved by reading the body of the latest-version
/// endpoint. Resolution fails soft: any lookup failure falls back to the
/// legacy detect version rather than aborting the run.
pub async fn resolve_version(
    client: &Client,
    coordinate: &Coordinate,
    template: &str,
    artifactory_base: &str,
    repository_name: &str,
) -> String {
    if !coordinate.is_latest() {
        return coordinate.version.clone();
    }

    let url = latest_version_url(
        template,
        artifactory_base,
        &coordinate.group,
        &coordinate.artifact,
        repository_name,
    );

    match fetch_latest(client, &url).await {
        Ok(version) => {
            debug!("Resolved {}:{} to version {}", coordinate.group, coordinate.artifact, version);
            version
        }
        Err(e) => {
            let fallback = Coordinate::legacy_detect().version;
            warn!(
                "Latest version lookup at {} failed ({}), falling back to {}",
                url, e, fallback
            );
            fallback
        }
    }
}

async fn fetch_latest(client: &Client, url: &str) -> anyhow::Result<String> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("latest version endpoint returned {}", status.as_u16());
    }
    Ok(response.text().await?)
}
