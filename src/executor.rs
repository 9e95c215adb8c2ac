//! Running npm: pinning its version and running the user's command.

use std::path::Path;

use crate::error::{Result, StepError};
use crate::locator::TOOL_NAME;
use crate::process::{CommandSpec, ProcessRunner};
use crate::resolver::ResolvedVersion;

/// Split a command string into words with shell-style quoting.
pub fn tokenize(command: &str) -> Result<Vec<String>> {
    let words = shlex::split(command)
        .ok_or_else(|| StepError::Config(format!("Unbalanced quotes in command: {}", command)))?;

    if words.is_empty() {
        return Err(StepError::Config("Command must not be empty".to_string()));
    }
    Ok(words)
}

pub struct CommandExecutor<'a> {
    runner: &'a dyn ProcessRunner,
}

impl<'a> CommandExecutor<'a> {
    pub fn new(runner: &'a dyn ProcessRunner) -> Self {
        Self { runner }
    }

    /// `npm install -g npm@<version>`
    pub async fn set_version(&self, version: &ResolvedVersion) -> Result<()> {
        let cmd = CommandSpec::new(TOOL_NAME)
            .args(["install", "-g"])
            .arg(format!("npm@{}", version));
        tracing::info!("$ {}", cmd.printable());

        let outcome = self.runner.capture(&cmd).await?;
        if !outcome.success() {
            tracing::info!("npm install output:\n{}", outcome.output);
            return Err(StepError::ToolVersion {
                version: version.to_string(),
                status: outcome.status_label(),
                output: outcome.output,
            });
        }

        if !outcome.output.is_empty() {
            tracing::info!("npm update output: {}", outcome.output);
        }
        Ok(())
    }

    /// Run `npm <args>` inside `workdir`, streaming its output.
    pub async fn run_user_command(&self, args: &[String], workdir: &Path) -> Result<()> {
        let cmd = CommandSpec::new(TOOL_NAME)
            .args(args.iter().cloned())
            .current_dir(workdir);
        tracing::info!("$ {}", cmd.printable());

        let outcome = self.runner.stream(&cmd).await?;
        if !outcome.success() {
            return Err(StepError::UserCommand {
                command: cmd.printable(),
                status: outcome.status_label(),
            });
        }
        Ok(())
    }
}
