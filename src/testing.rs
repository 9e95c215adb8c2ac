//! In-memory collaborators for unit tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::cache::BuildCache;
use crate::error::{Result, StepError};
use crate::locator::PathLookup;
use crate::manifest::ManifestSource;
use crate::process::{CommandOutcome, CommandSpec, ProcessRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    Capture,
    CaptureStdout,
    Stream,
}

/// Records every command; replies from a table keyed by printable command
/// line, succeeding with empty output otherwise.
#[derive(Default)]
pub struct FakeRunner {
    responses: HashMap<String, CommandOutcome>,
    calls: Mutex<Vec<(CallMode, CommandSpec)>>,
}

impl FakeRunner {
    pub fn respond(mut self, printable: &str, outcome: CommandOutcome) -> Self {
        self.responses.insert(printable.to_string(), outcome);
        self
    }

    pub fn calls(&self) -> Vec<(CallMode, CommandSpec)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn printed_calls(&self) -> Vec<String> {
        self.calls().iter().map(|(_, cmd)| cmd.printable()).collect()
    }

    fn record(&self, mode: CallMode, command: &CommandSpec) -> CommandOutcome {
        self.calls.lock().unwrap().push((mode, command.clone()));
        self.responses
            .get(&command.printable())
            .cloned()
            .unwrap_or_else(|| CommandOutcome::new("", Some(0)))
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn capture(&self, command: &CommandSpec) -> Result<CommandOutcome> {
        Ok(self.record(CallMode::Capture, command))
    }

    async fn capture_stdout(&self, command: &CommandSpec) -> Result<CommandOutcome> {
        Ok(self.record(CallMode::CaptureStdout, command))
    }

    async fn stream(&self, command: &CommandSpec) -> Result<CommandOutcome> {
        Ok(self.record(CallMode::Stream, command))
    }
}

#[derive(Default)]
pub struct FakeLookup {
    tools: HashMap<String, PathBuf>,
}

impl FakeLookup {
    pub fn with_tool(name: &str, path: &str) -> Self {
        let mut tools = HashMap::new();
        tools.insert(name.to_string(), PathBuf::from(path));
        Self { tools }
    }
}

impl PathLookup for FakeLookup {
    fn find(&self, name: &str) -> Option<PathBuf> {
        self.tools.get(name).cloned()
    }
}

#[derive(Default)]
pub struct FakeManifests {
    files: HashMap<PathBuf, String>,
    unreadable: Vec<PathBuf>,
}

impl FakeManifests {
    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(PathBuf::from(path), content.to_string());
        self
    }

    pub fn with_unreadable(mut self, path: &str) -> Self {
        self.unreadable.push(PathBuf::from(path));
        self
    }
}

impl ManifestSource for FakeManifests {
    fn read(&self, path: &Path) -> Result<Option<String>> {
        if self.unreadable.iter().any(|p| p == path) {
            return Err(StepError::ManifestRead {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            });
        }
        Ok(self.files.get(path).cloned())
    }
}

#[derive(Default)]
pub struct MemoryCache {
    pub pending: Vec<PathBuf>,
    pub committed: Vec<PathBuf>,
    pub fail_commit: bool,
}

#[async_trait]
impl BuildCache for MemoryCache {
    fn include_path(&mut self, path: PathBuf) {
        self.pending.push(path);
    }

    async fn commit(&mut self) -> Result<()> {
        if self.fail_commit {
            return Err(StepError::Cache("cache service unavailable".to_string()));
        }
        self.committed.append(&mut self.pending);
        Ok(())
    }
}
