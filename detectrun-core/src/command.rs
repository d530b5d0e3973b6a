//! Command line and environment construction for the detect invocation.
//!
//! Newer detect versions take their configuration as long-form `--key=value`
//! flags; older ones read one JSON object from the `SPRING_APPLICATION_JSON`
//! environment variable. The shape is picked once per run from the resolved
//! tool version and each variant owns its own serialization, so the branch
//! does not leak through the builder.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::credentials::ServerCredentials;
use crate::settings::DetectSettings;

/// Environment variable older detect versions load their configuration from.
pub const SPRING_APPLICATION_JSON: &str = "SPRING_APPLICATION_JSON";

/// Placeholder in system-variable values replaced by the project root path.
const ROOT_PROJECT_PLACEHOLDER: &str = "$rootProject";

/// Exclusion marker for the orchestrator's own output directory, always
/// present in the signature scanner exclusion list.
const OWN_OUTPUT_EXCLUSION: &str = "/blackduck/";

/// Snapshot of the host environment taken once per run, so the builder has
/// no ambient lookups and stays testable.
#[derive(Debug, Clone)]
pub struct HostEnv {
    /// The java binary used to launch detect.
    pub java: PathBuf,
    /// The inherited process environment.
    pub env: BTreeMap<String, String>,
}

impl HostEnv {
    /// Captures the current process environment. The java binary comes from
    /// `JAVA_HOME/bin/java` when set, otherwise `java` is left to PATH
    /// lookup at spawn time.
    pub fn capture() -> Self {
        let java = match std::env::var_os("JAVA_HOME") {
            Some(home) => {
                #[cfg(windows)]
                let bin = Path::new(&home).join("bin").join("java.exe");
                #[cfg(not(windows))]
                let bin = Path::new(&home).join("bin").join("java");
                bin
            }
            None => PathBuf::from("java"),
        };
        Self {
            java,
            env: std::env::vars().collect(),
        }
    }
}

/// How configuration reaches the child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigEmissionMode {
    /// One JSON object in `SPRING_APPLICATION_JSON` (detect <= 4).
    LegacyJson,
    /// Long-form `--key=value` flags (detect > 4, and the default when the
    /// version is unparseable).
    ModernFlags,
}

impl ConfigEmissionMode {
    /// Picks the mode from the resolved tool version: the numeric component
    /// before the first `.` decides, failing open towards the newer flag
    /// interface.
    pub fn from_version(version: &str) -> Self {
        match version.split('.').next().unwrap_or("").parse::<u32>() {
            Ok(major) if major > 4 => Self::ModernFlags,
            Ok(_) => Self::LegacyJson,
            Err(_) => Self::ModernFlags,
        }
    }
}

/// Everything the builder needs, gathered by the orchestrator.
pub struct CommandContext<'a> {
    pub settings: &'a DetectSettings,
    pub credentials: &'a ServerCredentials,
    pub detect_jar: &'a Path,
    /// Extracted scan-cli directory when offline mode is active.
    pub scan_cli_dir: Option<&'a Path>,
    /// Absolute project root.
    pub root_dir: &'a Path,
    /// Absolute build output directory.
    pub build_dir: &'a Path,
    pub host: &'a HostEnv,
    pub mode: ConfigEmissionMode,
}

/// An immutable child-process specification.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl ProcessSpec {
    /// The command line as one loggable string.
    pub fn display_command(&self) -> String {
        let mut out = self.program.display().to_string();
        for arg in &self.args {
            out.push(' ');
            out.push_str(arg);
        }
        out
    }
}

/// Assembles the scanner configuration map.
///
/// Fixed entries first, then conditional ones, then (in modern-flag mode
/// only) user system variables layered last so they win on collision.
pub fn build_config_map(ctx: &CommandContext<'_>) -> Result<BTreeMap<String, String>> {
    let (server_url, project_name) = ctx.settings.validate()?;

    let mut config = BTreeMap::new();
    config.insert("blackduck.hub.url".to_string(), server_url.to_string());
    config.insert(
        "blackduck.hub.username".to_string(),
        ctx.credentials.username.clone(),
    );
    config.insert(
        "blackduck.hub.password".to_string(),
        ctx.credentials.password.clone(),
    );
    config.insert(
        "logging.level.com.blackducksoftware.integration".to_string(),
        ctx.settings.log_level.clone(),
    );
    config.insert("detect.project.name".to_string(), project_name.to_string());
    config.insert(
        "detect.source.path".to_string(),
        ctx.root_dir.display().to_string(),
    );
    config.insert("detect.maven.scope".to_string(), ctx.settings.scope.clone());

    if let Some(scan_cli_dir) = ctx.scan_cli_dir {
        config.insert(
            "detect.hub.signature.scanner.offline.local.path".to_string(),
            scan_cli_dir.display().to_string(),
        );
    }

    if !ctx.settings.system_variables.contains_key("detect.output.path") {
        config.insert(
            "detect.output.path".to_string(),
            ctx.build_dir.join("blackduck").display().to_string(),
        );
    }

    config.insert(
        "detect.hub.signature.scanner.exclusion.patterns".to_string(),
        exclusion_patterns(&ctx.settings.exclusions),
    );

    if ctx.mode == ConfigEmissionMode::ModernFlags {
        for (key, value) in &ctx.settings.system_variables {
            config.insert(key.clone(), value.clone());
        }
    }

    Ok(config)
}

/// The orchestrator's own output directory is always excluded; user
/// exclusions follow in the order supplied, trimmed, empties dropped.
fn exclusion_patterns(user_exclusions: &[String]) -> String {
    std::iter::once(OWN_OUTPUT_EXCLUSION)
        .chain(
            user_exclusions
                .iter()
                .map(|e| e.trim())
                .filter(|e| !e.is_empty()),
        )
        .collect::<Vec<_>>()
        .join(",")
}

/// Key-prefix rewrites applied when emitting long-form flags, matching the
/// newer tool's flag naming.
fn rewrite_flag_key(key: &str) -> String {
    key.replace("blackduck.hub.", "blackduck.")
        .replace("detect.hub.", "detect.blackduck.")
}

/// Builds the full child-process specification.
pub fn build_process_spec(ctx: &CommandContext<'_>) -> Result<ProcessSpec> {
    let config = build_config_map(ctx)?;
    let root_path = ctx.root_dir.display().to_string();

    let mut args = Vec::new();
    args.extend(ctx.settings.jvm_options.iter().cloned());

    if ctx.mode == ConfigEmissionMode::LegacyJson {
        for (key, value) in &ctx.settings.system_variables {
            args.push(format!(
                "-D{}={}",
                key,
                value.replace(ROOT_PROJECT_PLACEHOLDER, &root_path)
            ));
        }
    }

    args.push("-jar".to_string());
    args.push(ctx.detect_jar.display().to_string());
    args.extend(ctx.settings.args.iter().cloned());

    if ctx.mode == ConfigEmissionMode::ModernFlags {
        for (key, value) in &config {
            args.push(format!("--{}={}", rewrite_flag_key(key), value));
        }
    }

    let mut env = ctx.host.env.clone();
    for (key, value) in &ctx.settings.environment {
        env.insert(key.clone(), value.clone());
    }
    if ctx.mode == ConfigEmissionMode::LegacyJson {
        let json = serde_json::to_string(&config)
            .context("Failed to serialize scanner configuration")?;
        env.insert(SPRING_APPLICATION_JSON.to_string(), json);
    }

    Ok(ProcessSpec {
        program: ctx.host.java.clone(),
        args,
        env,
    })
}
