//! detectrun command-line interface.
//!
//! Loads run settings and credentials, then drives one detect invocation:
//! resolve-or-download the scanner, configure it, run it with inherited
//! console I/O, and validate its exit code.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use detectrun_core::{CredentialStore, DetectSettings, ScanRunner};

#[derive(Debug, Parser)]
#[command(name = "detectrun", version, about = "Run Black Duck detect for a dependency audit")]
struct Cli {
    /// Path to the run settings JSON file.
    #[arg(long, default_value = "detectrun.json")]
    config: PathBuf,

    /// Path to the credential store JSON file.
    #[arg(long, default_value = "credentials.json")]
    credentials: PathBuf,

    /// Run the signature scanner offline against a local scan-cli.
    #[arg(long)]
    offline: bool,

    /// Force a fresh scan-cli download even when it resolves locally.
    #[arg(long)]
    force_scan_cli_download: bool,

    /// Log level handed to the scanner (overrides the settings file).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with environment-based filtering.
    // Set RUST_LOG=debug for verbose logging.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    tracing::debug!("detectrun {} starting", detectrun_core::VERSION);

    let mut settings = DetectSettings::load(&cli.config)?;
    if cli.offline {
        settings.scan_cli_offline = true;
    }
    if cli.force_scan_cli_download {
        settings.force_scan_cli_download = true;
    }
    if let Some(log_level) = cli.log_level {
        settings.log_level = log_level;
    }

    let store = CredentialStore::load(&cli.credentials)
        .with_context(|| format!("Failed to load credentials from {}", cli.credentials.display()))?;
    let credentials = store.get(&settings.server_id)?.clone();

    let runner = ScanRunner::new(settings, credentials);
    runner.run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_parse() {
        let cli = Cli::parse_from([
            "detectrun",
            "--config",
            "audit.json",
            "--offline",
            "--log-level",
            "DEBUG",
        ]);
        assert_eq!(cli.config, PathBuf::from("audit.json"));
        assert!(cli.offline);
        assert!(!cli.force_scan_cli_download);
        assert_eq!(cli.log_level.as_deref(), Some("DEBUG"));
    }
}
