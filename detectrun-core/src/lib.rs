//! Detectrun Core Library
//!
//! This crate orchestrates a Black Duck detect run during the
//! dependency-audit phase of a build. It includes:
//!
//! - Coordinate parsing and latest-version resolution with a legacy fallback
//! - Artifact resolution against an ordered repository list with a local
//!   Maven-layout store
//! - Streaming HTTP download with whole-percentage progress
//! - Zip extraction for the offline scan-cli
//! - Command line and environment construction (legacy JSON vs. long-form
//!   flag emission)
//! - Child process execution with inherited console I/O
//! - Exit code validation

pub mod archive;
pub mod command;
pub mod coordinate;
pub mod credentials;
pub mod downloader;
pub mod exit_code;
pub mod fetcher;
pub mod repository;
pub mod resolver;
pub mod runner;
pub mod scan;
pub mod settings;

// Re-exports for convenience
pub use command::{
    build_config_map, build_process_spec, CommandContext, ConfigEmissionMode, HostEnv, ProcessSpec,
};
pub use coordinate::{Coordinate, CoordinateError, LEGACY_DETECT_GAV};
pub use credentials::{CredentialStore, CredentialStoreError, ServerCredentials};
pub use downloader::DownloadProgress;
pub use exit_code::ExitExpectation;
pub use repository::{LocalRepository, RemoteRepository};
pub use scan::ScanRunner;
pub use settings::DetectSettings;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
