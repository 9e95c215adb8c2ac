//! Finding npm on the PATH and asking it for its version.

use std::path::{Path, PathBuf};

use crate::error::{Result, StepError};
use crate::process::{CommandSpec, ProcessRunner};

pub const TOOL_NAME: &str = "npm";

/// Executable lookup on the execution path.
pub trait PathLookup: Send + Sync {
    fn find(&self, name: &str) -> Option<PathBuf>;
}

/// PATH lookup backed by the `which` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhichLookup;

impl PathLookup for WhichLookup {
    fn find(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }
}

pub struct ToolLocator<'a> {
    lookup: &'a dyn PathLookup,
    runner: &'a dyn ProcessRunner,
}

impl<'a> ToolLocator<'a> {
    pub fn new(lookup: &'a dyn PathLookup, runner: &'a dyn ProcessRunner) -> Self {
        Self { lookup, runner }
    }

    /// Path of the npm executable, `None` if it is not installed.
    pub fn find(&self) -> Option<PathBuf> {
        let path = self.lookup.find(TOOL_NAME);
        match path {
            Some(ref p) => tracing::info!("Using npm installation located at {}", p.display()),
            None => tracing::debug!("npm not found on PATH"),
        }
        path
    }

    /// Self-reported version of the npm at `path`: the first non-empty line
    /// of its stdout. Warnings npm prints on stderr are ignored.
    pub async fn installed_version(&self, path: &Path) -> Result<String> {
        let cmd = CommandSpec::new(path.to_string_lossy()).arg("--version");
        tracing::info!("$ {}", cmd.printable());

        let outcome = self.runner.capture_stdout(&cmd).await?;
        if !outcome.success() {
            return Err(StepError::CommandFailed {
                command: cmd.printable(),
                status: outcome.status_label(),
                output: outcome.output,
            });
        }

        let version = outcome
            .output
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default();
        Ok(version.to_string())
    }
}
