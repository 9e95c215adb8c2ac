use std::path::PathBuf;

use crate::error::{Result, StepError};
use crate::executor::tokenize;

/// Step inputs, fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepConfig {
    pub workdir: PathBuf,
    /// Raw npm command, e.g. `install` or `run build -- --prod`.
    pub command: String,
    /// `command` split into npm arguments.
    pub args: Vec<String>,
    /// Explicit npm version; `None` enables autodetection.
    pub npm_version: Option<String>,
    pub cache_local_deps: bool,
}

impl StepConfig {
    pub fn new(
        workdir: &str,
        command: impl Into<String>,
        npm_version: Option<String>,
        cache_local_deps: bool,
    ) -> Result<Self> {
        let command = command.into();
        if command.trim().is_empty() {
            return Err(StepError::Config("command must not be empty".to_string()));
        }

        let args = tokenize(&command)?;
        let workdir = if workdir.trim().is_empty() { "." } else { workdir };

        Ok(Self {
            workdir: PathBuf::from(shellexpand::tilde(workdir).to_string()),
            command,
            args,
            npm_version: npm_version
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            cache_local_deps,
        })
    }

    pub fn log_summary(&self) {
        tracing::info!("Configs:");
        tracing::info!(" - Workdir: {}", self.workdir.display());
        tracing::info!(" - Command: {}", self.command);
        tracing::info!(
            " - NpmVersion: {}",
            self.npm_version.as_deref().unwrap_or("<autodetect>")
        );
        tracing::info!(" - CacheLocalDeps: {}", self.cache_local_deps);
    }
}
