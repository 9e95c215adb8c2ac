//! Picking the npm version for this run.
//!
//! Sources are consulted in a fixed order and the first one that yields a
//! version wins:
//!
//! 1. the explicitly configured version
//! 2. `engines.npm` in the project's package.json
//! 3. the version of the npm already on the PATH
//! 4. `latest`, installing npm first when it is missing entirely

use std::fmt;
use std::path::Path;

use crate::error::Result;
use crate::locator::{ToolLocator, TOOL_NAME};
use crate::manifest::{extract_version, manifest_path, ManifestSource, VersionSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedVersion {
    Exact(String),
    Latest,
}

impl fmt::Display for ResolvedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(v) => write!(f, "{}", v),
            Self::Latest => write!(f, "latest"),
        }
    }
}

/// Where the resolved version came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSource {
    Config,
    Manifest,
    Installed,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub version: ResolvedVersion,
    pub source: VersionSource,
    /// npm is not on the PATH and has to be installed before use.
    pub install_required: bool,
}

impl Resolution {
    fn exact(version: impl Into<String>, source: VersionSource) -> Self {
        Self {
            version: ResolvedVersion::Exact(version.into()),
            source,
            install_required: false,
        }
    }

    fn latest(install_required: bool) -> Self {
        Self {
            version: ResolvedVersion::Latest,
            source: VersionSource::Fallback,
            install_required,
        }
    }
}

pub struct VersionResolver<'a> {
    manifests: &'a dyn ManifestSource,
    locator: ToolLocator<'a>,
}

impl<'a> VersionResolver<'a> {
    pub fn new(manifests: &'a dyn ManifestSource, locator: ToolLocator<'a>) -> Self {
        Self { manifests, locator }
    }

    /// Only a malformed version pin in the manifest is an error; every other
    /// failure is logged and resolution moves on to the next source.
    pub async fn resolve(&self, explicit: Option<&str>, workdir: &Path) -> Result<Resolution> {
        if let Some(version) = explicit.map(str::trim).filter(|v| !v.is_empty()) {
            tracing::info!("Using npm version {} from step input", version);
            return Ok(Resolution::exact(version, VersionSource::Config));
        }

        tracing::info!("No npm version provided as step input. Checking package.json.");
        if let Some(version) = self.manifest_version(workdir)? {
            tracing::info!("Using npm version {} from package.json", version);
            return Ok(Resolution::exact(version, VersionSource::Manifest));
        }

        let Some(path) = self.locator.find() else {
            tracing::warn!("npm not found on PATH, falling back to latest");
            return Ok(Resolution::latest(true));
        };

        match self.locator.installed_version(&path).await {
            Ok(version) if !version.is_empty() => {
                tracing::info!("Using installed npm version {}", version);
                Ok(Resolution::exact(version, VersionSource::Installed))
            }
            Ok(_) => {
                tracing::warn!("npm reported an empty version, falling back to latest");
                Ok(Resolution::latest(false))
            }
            Err(e) => {
                if let Some(output) = e.process_output() {
                    tracing::debug!("npm --version output:\n{}", output);
                }
                tracing::warn!("Unknown installed npm version ({}), falling back to latest", e);
                Ok(Resolution::latest(false))
            }
        }
    }

    fn manifest_version(&self, workdir: &Path) -> Result<Option<String>> {
        let path = manifest_path(workdir);

        let contents = match self.manifests.read(&path) {
            Ok(Some(contents)) => contents,
            Ok(None) => {
                tracing::warn!("No package.json found at {}", path.display());
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!("{}", e);
                return Ok(None);
            }
        };

        match extract_version(&contents, &path, TOOL_NAME) {
            Ok(VersionSpec::Pinned(version)) => Ok(Some(version)),
            Ok(VersionSpec::Unconstrained) => {
                tracing::warn!("No npm version found in package.json! Falling back to installed npm.");
                Ok(None)
            }
            Err(e) if e.is_fatal_for_resolution() => Err(e),
            Err(e) => {
                tracing::warn!("{}", e);
                Ok(None)
            }
        }
    }
}
