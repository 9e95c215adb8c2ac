//! package.json handling: reading the manifest and extracting the
//! `engines.<tool>` version pin.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, StepError};

pub const MANIFEST_FILE: &str = "package.json";

/// Outcome of looking for a version pin in a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSpec {
    /// Canonical `MAJOR.MINOR.PATCH` version.
    Pinned(String),
    /// The manifest was read, but it pins no version for the tool.
    Unconstrained,
}

#[derive(Debug, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    engines: Option<HashMap<String, serde_json::Value>>,
}

/// Access to manifest files.
pub trait ManifestSource: Send + Sync {
    /// Returns `Ok(None)` when the manifest does not exist.
    fn read(&self, path: &Path) -> Result<Option<String>>;
}

/// Reads manifests from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsManifestSource;

impl ManifestSource for FsManifestSource {
    fn read(&self, path: &Path) -> Result<Option<String>> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StepError::ManifestRead {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

pub fn manifest_path(workdir: &Path) -> PathBuf {
    workdir.join(MANIFEST_FILE)
}

/// Extract the version pinned under `engines.<tool>`.
///
/// Ranges, partial versions and prerelease/build qualifiers are rejected
/// rather than truncated.
pub fn extract_version(contents: &str, path: &Path, tool: &str) -> Result<VersionSpec> {
    let manifest: PackageManifest =
        serde_json::from_str(contents).map_err(|source| StepError::ManifestParse {
            path: path.to_path_buf(),
            source,
        })?;

    let Some(value) = manifest.engines.as_ref().and_then(|engines| engines.get(tool)) else {
        return Ok(VersionSpec::Unconstrained);
    };

    let raw = match value {
        serde_json::Value::Null => return Ok(VersionSpec::Unconstrained),
        serde_json::Value::String(s) => s.trim(),
        other => {
            return Err(StepError::version_format(
                other.to_string(),
                "expected a version string",
            ))
        }
    };

    if raw.is_empty() {
        return Ok(VersionSpec::Unconstrained);
    }

    let version =
        semver::Version::parse(raw).map_err(|e| StepError::version_format(raw, e.to_string()))?;

    if !version.pre.is_empty() || !version.build.is_empty() {
        return Err(StepError::version_format(
            raw,
            "prerelease and build qualifiers are not supported",
        ));
    }

    Ok(VersionSpec::Pinned(version.to_string()))
}
