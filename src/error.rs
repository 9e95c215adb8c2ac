//! Error taxonomy for the step.
//!
//! Every stage returns a [`Result`]; whether an error aborts the run or is
//! downgraded to a warning is decided by the pipeline, never by the stage.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StepError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The manifest exists but could not be read.
    #[error("Failed to read manifest {}: {source}", .path.display())]
    ManifestRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The manifest is not valid JSON or has an unexpected shape.
    #[error("Failed to parse manifest {}: {source}", .path.display())]
    ManifestParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A pinned version is not a plain `MAJOR.MINOR.PATCH` semantic version.
    #[error("Invalid npm version '{version}': {reason}")]
    VersionFormat { version: String, reason: String },

    /// The process could not be started at all.
    #[error("Failed to run '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// A helper command exited unsuccessfully. `output` is kept for logging.
    #[error("Command '{command}' failed with {status}")]
    CommandFailed {
        command: String,
        status: String,
        output: String,
    },

    #[error("Unsupported platform '{os}': npm can only be installed on darwin or linux")]
    UnsupportedPlatform { os: String },

    #[error("Failed to install npm with '{command}': {status}")]
    Install { command: String, status: String },

    #[error("Could not set npm to version {version}: {status}")]
    ToolVersion {
        version: String,
        status: String,
        output: String,
    },

    #[error("Command '{command}' failed with {status}")]
    UserCommand { command: String, status: String },

    #[error("Failed to mark dependencies for caching: {0}")]
    Cache(String),
}

impl StepError {
    /// Create a version format error
    pub fn version_format(version: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::VersionFormat {
            version: version.into(),
            reason: reason.into(),
        }
    }

    /// Create a spawn error for the given printable command line
    pub fn spawn(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            command: command.into(),
            source,
        }
    }

    /// Output captured from a failed process, logged apart from the message.
    pub fn process_output(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { output, .. } | Self::ToolVersion { output, .. } => {
                Some(output.as_str()).filter(|o| !o.trim().is_empty())
            }
            _ => None,
        }
    }

    /// Errors that must stop version resolution instead of falling through.
    pub fn is_fatal_for_resolution(&self) -> bool {
        matches!(self, Self::VersionFormat { .. })
    }
}

pub type Result<T> = std::result::Result<T, StepError>;
