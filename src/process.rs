//! External process invocation.
//!
//! Every command the step runs goes through a [`ProcessRunner`], so stages can
//! be exercised against a scripted runner without touching the process table.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;

use crate::error::{Result, StepError};

/// A fully specified command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Human-readable command line, shell-quoted where needed.
    pub fn printable(&self) -> String {
        let words = std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str));
        match shlex::try_join(words) {
            Ok(line) => line,
            // Only NUL bytes can't be quoted; show the raw words instead.
            Err(_) => std::iter::once(self.program.clone())
                .chain(self.args.iter().cloned())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// Result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Captured output (combined or stdout-only), empty when streamed.
    pub output: String,

    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl CommandOutcome {
    pub fn new(output: impl Into<String>, code: Option<i32>) -> Self {
        Self {
            output: output.into(),
            code,
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Short description of how the process ended, for diagnostics.
    pub fn status_label(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion, capturing combined output.
    async fn capture(&self, command: &CommandSpec) -> Result<CommandOutcome>;

    /// Run to completion, capturing stdout only. Stderr is discarded.
    async fn capture_stdout(&self, command: &CommandSpec) -> Result<CommandOutcome>;

    /// Run to completion with stdout/stderr inherited from the step.
    async fn stream(&self, command: &CommandSpec) -> Result<CommandOutcome>;
}

/// Runs commands on the host with tokio.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    fn build(command: &CommandSpec) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args);
        if let Some(ref dir) = command.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn capture(&self, command: &CommandSpec) -> Result<CommandOutcome> {
        let output = Self::build(command)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| StepError::spawn(command.printable(), e))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutcome::new(combined.trim(), output.status.code()))
    }

    async fn capture_stdout(&self, command: &CommandSpec) -> Result<CommandOutcome> {
        let output = Self::build(command)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| StepError::spawn(command.printable(), e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(CommandOutcome::new(stdout.trim(), output.status.code()))
    }

    async fn stream(&self, command: &CommandSpec) -> Result<CommandOutcome> {
        let status = Self::build(command)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| StepError::spawn(command.printable(), e))?;

        Ok(CommandOutcome::new(String::new(), status.code()))
    }
}
