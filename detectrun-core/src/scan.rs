//! End-to-end orchestration of one detect run.
//!
//! The sequence is strictly sequential: validate configuration, fetch the
//! detect jar, in offline mode fetch and extract scan-cli, build the
//! command and environment, run the scanner with inherited console I/O,
//! and validate the exit code. Any unrecoverable step aborts the run.

use anyhow::{Context, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::archive::extract_zip;
use crate::command::{build_process_spec, CommandContext, ConfigEmissionMode, HostEnv};
use crate::credentials::ServerCredentials;
use crate::exit_code::ExitExpectation;
use crate::fetcher::{fetch_detect_jar, fetch_scan_cli};
use crate::repository::{repository_list, LocalRepository};
use crate::runner;
use crate::settings::DetectSettings;

/// Orchestrates one scanner invocation.
pub struct ScanRunner {
    settings: DetectSettings,
    credentials: ServerCredentials,
    client: Client,
}

impl ScanRunner {
    pub fn new(settings: DetectSettings, credentials: ServerCredentials) -> Self {
        Self {
            settings,
            credentials,
            client: Client::new(),
        }
    }

    /// Runs the whole sequence and returns the scanner's exit code.
    pub async fn run(&self) -> Result<i32> {
        self.settings.validate()?;

        let repositories = repository_list(
            &self.settings.artifactory_base,
            &self.settings.artifact_repository_name,
            &self.settings.repositories,
        );
        let local = LocalRepository::new(self.settings.local_repository_path());

        let (detect_jar, version) =
            fetch_detect_jar(&self.client, &self.settings, &repositories, &local).await?;
        info!("Using detect {} at {}", version, detect_jar.display());

        let scan_cli_dir = if self.settings.scan_cli_offline {
            Some(self.prepare_scan_cli(&version, &local).await?)
        } else {
            None
        };

        let mode = ConfigEmissionMode::from_version(&version);
        debug!("Configuration emission mode: {:?}", mode);

        let host = HostEnv::capture();
        let root_dir = absolute(&self.settings.root_dir)?;
        let build_dir = absolute(&self.settings.build_dir)?;

        let spec = build_process_spec(&CommandContext {
            settings: &self.settings,
            credentials: &self.credentials,
            detect_jar: &detect_jar,
            scan_cli_dir: scan_cli_dir.as_deref(),
            root_dir: &root_dir,
            build_dir: &build_dir,
            host: &host,
            mode,
        })?;

        let exit_code = runner::run(&spec).await?;

        ExitExpectation::parse(&self.settings.validate_exit_code).validate(exit_code)?;
        Ok(exit_code)
    }

    /// Fetches and extracts scan-cli for offline scanning. Extraction runs
    /// only when the destination directory does not exist yet.
    async fn prepare_scan_cli(&self, version: &str, local: &LocalRepository) -> Result<PathBuf> {
        let zip = fetch_scan_cli(&self.client, &self.settings, version, local).await?;
        let dir = self.settings.scan_cli_extract_dir();
        if !dir.exists() {
            extract_zip(&zip, &dir, true)?;
        }
        Ok(dir)
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to determine working directory")?;
    Ok(cwd.join(path))
}
