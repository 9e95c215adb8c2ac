//! Installing npm with the platform package manager when it is missing.

use crate::error::{Result, StepError};
use crate::process::{CommandSpec, ProcessRunner};

/// Install command for the given OS identifier (`std::env::consts::OS` style).
pub fn install_command(os: &str) -> Result<CommandSpec> {
    match os {
        // Homebrew ships npm as part of node
        "darwin" | "macos" => Ok(CommandSpec::new("brew").args(["install", "node"])),
        "linux" => Ok(CommandSpec::new("apt-get").args(["-y", "install", "npm"])),
        other => Err(StepError::UnsupportedPlatform {
            os: other.to_string(),
        }),
    }
}

/// Install npm, streaming the package manager's progress.
pub async fn install(runner: &dyn ProcessRunner, os: &str) -> Result<()> {
    let cmd = install_command(os)?;
    tracing::warn!("npm not found on PATH, installing latest version");
    tracing::info!("$ {}", cmd.printable());

    let outcome = runner.stream(&cmd).await?;
    if !outcome.success() {
        return Err(StepError::Install {
            command: cmd.printable(),
            status: outcome.status_label(),
        });
    }

    tracing::info!("Installing npm done");
    Ok(())
}
