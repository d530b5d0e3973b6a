//! Child process execution with inherited console I/O.

use anyhow::{Context, Result};
use std::process::Stdio;
use tokio::process::Command;
use tracing::info;

use crate::command::ProcessSpec;

/// Runs the child process described by `spec` and returns its exit code.
///
/// Console streams are passed through unmodified. The wait is cancellable:
/// Ctrl-C while waiting abandons the wait and surfaces an interruption
/// error instead of swallowing it. The environment is exactly `spec.env`,
/// nothing ambient leaks in.
pub async fn run(spec: &ProcessSpec) -> Result<i32> {
    info!("Launching: {}", spec.display_command());

    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .env_clear()
        .envs(&spec.env)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .with_context(|| format!("Failed to start {}", spec.program.display()))?;

    let status = tokio::select! {
        status = child.wait() => {
            status.with_context(|| format!("Failed waiting for {}", spec.program.display()))?
        }
        _ = tokio::signal::ctrl_c() => {
            anyhow::bail!("Interrupted while waiting for {}", spec.program.display());
        }
    };

    let code = status
        .code()
        .with_context(|| format!("{} was terminated by a signal", spec.program.display()))?;
    info!("Output: {}", code);
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn spec(program: &str, args: &[&str]) -> ProcessSpec {
        ProcessSpec {
            program: PathBuf::from(program),
            args: args.iter().map(|s| s.to_string()).collect(),
            env: BTreeMap::from([(
                "PATH".to_string(),
                std::env::var("PATH").unwrap_or_default(),
            )]),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_code_reported() {
        let code = run(&spec("sh", &["-c", "exit 3"])).await.unwrap();
        assert_eq!(code, 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_zero_exit() {
        let code = run(&spec("true", &[])).await.unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_fatal() {
        let err = run(&spec("/nonexistent/detectrun-java", &[]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to start"));
    }
}
