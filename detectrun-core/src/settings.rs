//! Run settings for detect orchestration.
//!
//! Settings are deserialized from a JSON file; every field except the
//! server URL and project name has a default matching the stock detect
//! integration, so a minimal configuration is just those two keys plus a
//! credential entry.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::repository::RemoteRepository;

fn default_server_id() -> String {
    "blackduck".to_string()
}

fn default_root_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("target")
}

fn default_artifactory_base() -> String {
    "https://repo.blackducksoftware.com/artifactory".to_string()
}

fn default_artifact_repository_name() -> String {
    "bds-integrations-release".to_string()
}

fn default_latest_version_url() -> String {
    "%s/api/search/latestVersion?g=%s&a=%s&repos=%s".to_string()
}

fn default_executable_gav() -> String {
    "com.synopsys.integration:synopsys-detect:latest".to_string()
}

fn default_scan_cli_gav() -> String {
    "com.blackducksoftware.integration:scan-cli:latest".to_string()
}

fn default_scan_cli_download_url() -> String {
    "https://blackduck.talend.com/download/scan.cli.zip".to_string()
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_validate_exit_code() -> String {
    "0".to_string()
}

fn default_scope() -> String {
    "runtime".to_string()
}

/// The complete configuration surface of a detect run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectSettings {
    /// Target Black Duck service URL. Required.
    #[serde(default)]
    pub server_url: Option<String>,

    /// Project display name reported to the service. Required.
    #[serde(default)]
    pub project_name: Option<String>,

    /// Name of the credential-store entry holding username/password.
    #[serde(default = "default_server_id")]
    pub server_id: String,

    /// Root directory of the audited project.
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Build output directory; caches and scratch files live below it.
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,

    /// Where the detect jar is cached. Defaults to
    /// `{build_dir}/blackduck/synopsys-detect.jar`.
    #[serde(default)]
    pub detect_cache: Option<PathBuf>,

    /// Where the scan-cli zip is cached. Defaults to
    /// `{build_dir}/blackduck/scan-cli`.
    #[serde(default)]
    pub scan_cli_cache: Option<PathBuf>,

    /// Artifactory instance the detect jar is published to.
    #[serde(default = "default_artifactory_base")]
    pub artifactory_base: String,

    /// Repository within the artifactory instance.
    #[serde(default = "default_artifact_repository_name")]
    pub artifact_repository_name: String,

    /// `%s`-templated latest-version query. Substitution order: base,
    /// group, artifact, repository name.
    #[serde(default = "default_latest_version_url")]
    pub latest_version_url: String,

    /// Detect jar coordinates; pin the version here instead of `latest`.
    #[serde(default = "default_executable_gav")]
    pub executable_gav: String,

    /// Scan-cli archive coordinates.
    #[serde(default = "default_scan_cli_gav")]
    pub scan_cli_gav: String,

    /// Direct download URL used when scan-cli cannot be resolved.
    #[serde(default = "default_scan_cli_download_url")]
    pub scan_cli_download_url: String,

    /// Run the signature scanner against a pre-extracted local scan-cli
    /// instead of contacting the service.
    #[serde(default)]
    pub scan_cli_offline: bool,

    /// Skip resolution and always re-download scan-cli.
    #[serde(default)]
    pub force_scan_cli_download: bool,

    /// Log level handed to the scanner.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Exit code expectation: an integer, `true` (same as `0`), or any
    /// other string to skip validation.
    #[serde(default = "default_validate_exit_code")]
    pub validate_exit_code: String,

    /// Dependency scope used for detection.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Extra system properties for the scanner invocation.
    #[serde(default)]
    pub system_variables: BTreeMap<String, String>,

    /// Environment overrides for the child process (later wins).
    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    /// Extra JVM options, placed before `-jar`.
    #[serde(default)]
    pub jvm_options: Vec<String>,

    /// Extra CLI arguments, placed right after the jar path.
    #[serde(default)]
    pub args: Vec<String>,

    /// Path exclusion patterns for the signature scanner.
    #[serde(default)]
    pub exclusions: Vec<String>,

    /// Repositories declared by the enclosing project, in priority order.
    #[serde(default)]
    pub repositories: Vec<RemoteRepository>,

    /// Local artifact repository root. Defaults to `~/.m2/repository`.
    #[serde(default)]
    pub local_repository: Option<PathBuf>,
}

impl Default for DetectSettings {
    fn default() -> Self {
        serde_json::from_str("{}").expect("empty settings deserialize")
    }
}

impl DetectSettings {
    /// Loads settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings at {}", path.display()))
    }

    /// Checks the required fields, returning `(server_url, project_name)`.
    ///
    /// Every missing required key fails the same way; there is no
    /// log-and-continue path.
    pub fn validate(&self) -> Result<(&str, &str)> {
        let server_url = self
            .server_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .context("No server URL configured, set server_url")?;
        let project_name = self
            .project_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .context("No project name configured, set project_name")?;
        Ok((server_url, project_name))
    }

    pub fn detect_cache_path(&self) -> PathBuf {
        self.detect_cache
            .clone()
            .unwrap_or_else(|| self.build_dir.join("blackduck").join("synopsys-detect.jar"))
    }

    pub fn scan_cli_cache_path(&self) -> PathBuf {
        self.scan_cli_cache
            .clone()
            .unwrap_or_else(|| self.build_dir.join("blackduck").join("scan-cli"))
    }

    pub fn local_repository_path(&self) -> PathBuf {
        self.local_repository.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".m2")
                .join("repository")
        })
    }

    /// Scratch directory for transient downloads.
    pub fn scratch_dir(&self) -> PathBuf {
        self.build_dir.join("blackduck").join("detectrun")
    }

    /// Destination for the extracted scan-cli.
    pub fn scan_cli_extract_dir(&self) -> PathBuf {
        self.build_dir.join("blackduck").join("scancli")
    }
}
