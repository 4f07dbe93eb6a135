//! Compose CLI driver: bring a stack up pinned to a version, or tear it
//! down.

use crate::error::BuilderError;
use crate::Result;
use semver::Version;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::info;

/// Environment variable the compose files read the release version from.
const VERSION_KEY: &str = "VERSION";

/// Which compose CLI flavor the host provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeCli {
    /// Standalone `docker-compose`.
    V1,
    /// `docker compose` plugin.
    V2,
}

pub struct Compose {
    cli: ComposeCli,
}

impl Compose {
    pub fn new(cli: ComposeCli) -> Self {
        Self { cli }
    }

    /// `up -d` in `compose_dir` with `VERSION=<version>` in the child
    /// environment.
    pub async fn up(&self, compose_dir: &Path, version: &Version) -> Result<String> {
        let (program, base) = self.resolve()?;
        exec(&program, &base, &["up", "-d"], compose_dir, Some(version)).await
    }

    /// `down` in `compose_dir`; no version injection.
    pub async fn down(&self, compose_dir: &Path) -> Result<String> {
        let (program, base) = self.resolve()?;
        exec(&program, &base, &["down"], compose_dir, None).await
    }

    fn resolve(&self) -> Result<(PathBuf, Vec<&'static str>)> {
        match self.cli {
            ComposeCli::V1 => {
                let program = which::which("docker-compose")
                    .map_err(|_| BuilderError::MissingCli("docker-compose".to_string()))?;
                Ok((program, vec![]))
            }
            ComposeCli::V2 => {
                let program = which::which("docker")
                    .map_err(|_| BuilderError::MissingCli("docker".to_string()))?;
                Ok((program, vec!["compose"]))
            }
        }
    }
}

/// Run `program base… args…` in `dir`, capturing stdout and stderr into one
/// transcript. Non-zero exit returns the transcript wrapped in the error.
async fn exec(
    program: &Path,
    base: &[&str],
    args: &[&str],
    dir: &Path,
    version: Option<&Version>,
) -> Result<String> {
    let meta = std::fs::metadata(dir)
        .map_err(|e| BuilderError::InvalidComposeDir(format!("{}: {e}", dir.display())))?;
    if !meta.is_dir() {
        return Err(BuilderError::InvalidComposeDir(format!(
            "not a directory: {}",
            dir.display()
        )));
    }

    let mut cmd = Command::new(program);
    cmd.args(base).args(args).current_dir(dir);
    if let Some(version) = version {
        cmd.env(VERSION_KEY, version.to_string());
    }

    info!(program = %program.display(), ?args, dir = %dir.display(), "running compose command");

    let output = cmd.output().await?;
    let mut transcript = String::from_utf8_lossy(&output.stdout).into_owned();
    transcript.push_str(&String::from_utf8_lossy(&output.stderr));

    if !output.status.success() {
        return Err(BuilderError::CommandFailed {
            program: program.display().to_string(),
            code: output.status.code().unwrap_or(-1),
            output: transcript,
        });
    }
    Ok(transcript)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
