//! Marking `node_modules` for reuse by later pipeline runs.
//!
//! The step only decides what should be cached. Persisting it is the job of
//! the build cache service, reached through [`BuildCache`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{Result, StepError};
use crate::process::{CommandSpec, ProcessRunner};

/// First tokens that mean "install dependencies".
///
/// `isntall` is a real typo npm accepts, and existing pipelines use it.
pub const INSTALL_VERBS: &[&str] = &["install", "i", "add", "ci", "isntall"];

pub const DEPENDENCY_DIR: &str = "node_modules";
pub const LOCK_FILE: &str = "package-lock.json";

/// Environment variable the cache service reads its include list from.
pub const CACHE_INCLUDE_PATHS_ENV: &str = "BITRISE_CACHE_INCLUDE_PATHS";

pub fn should_cache(first_token: &str, enabled: bool) -> bool {
    enabled && INSTALL_VERBS.contains(&first_token)
}

/// The build cache service.
#[async_trait]
pub trait BuildCache: Send {
    /// Declare a path eligible for caching.
    fn include_path(&mut self, path: PathBuf);

    /// Hand every declared path over to the cache service.
    async fn commit(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOutcome {
    /// No dependency directory to cache.
    NothingToCache,
    Marked(Vec<PathBuf>),
}

/// Register `<workdir>/node_modules`, and the lock file when present.
pub async fn mark_dependencies(workdir: &Path, cache: &mut dyn BuildCache) -> Result<CacheOutcome> {
    let dependency_dir = workdir.join(DEPENDENCY_DIR);
    if !dependency_dir.is_dir() {
        tracing::warn!(
            "Local {} directory does not exist: {}",
            DEPENDENCY_DIR,
            dependency_dir.display()
        );
        return Ok(CacheOutcome::NothingToCache);
    }

    let mut paths = vec![dependency_dir];
    let lock_file = workdir.join(LOCK_FILE);
    if lock_file.is_file() {
        paths.push(lock_file);
    } else {
        tracing::debug!("{} not found, caching {} only", LOCK_FILE, DEPENDENCY_DIR);
    }

    for path in &paths {
        cache.include_path(path.clone());
    }
    cache.commit().await?;

    tracing::info!("Marked {} for caching", DEPENDENCY_DIR);
    Ok(CacheOutcome::Marked(paths))
}

/// Cache service client that exports the include list with `envman`.
pub struct EnvmanCache<'a> {
    runner: &'a dyn ProcessRunner,
    pending: Vec<PathBuf>,
}

impl<'a> EnvmanCache<'a> {
    pub fn new(runner: &'a dyn ProcessRunner) -> Self {
        Self {
            runner,
            pending: Vec::new(),
        }
    }
}

#[async_trait]
impl<'a> BuildCache for EnvmanCache<'a> {
    fn include_path(&mut self, path: PathBuf) {
        self.pending.push(path);
    }

    async fn commit(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let existing = std::env::var(CACHE_INCLUDE_PATHS_ENV).unwrap_or_default();
        let value = merge_include_paths(&existing, &self.pending);

        let cmd = CommandSpec::new("envman")
            .args(["add", "--key", CACHE_INCLUDE_PATHS_ENV, "--value"])
            .arg(value);
        tracing::debug!("$ {}", cmd.printable());

        let outcome = self
            .runner
            .capture(&cmd)
            .await
            .map_err(|e| StepError::Cache(e.to_string()))?;
        if !outcome.success() {
            tracing::debug!("envman output:\n{}", outcome.output);
            return Err(StepError::Cache(format!(
                "envman failed with {}",
                outcome.status_label()
            )));
        }

        self.pending.clear();
        Ok(())
    }
}

/// Newline-separated include list: existing entries first, no duplicates.
pub fn merge_include_paths(existing: &str, paths: &[PathBuf]) -> String {
    let mut merged: Vec<String> = Vec::new();
    let new = paths.iter().map(|p| p.to_string_lossy().to_string());

    for entry in existing.lines().map(str::trim).map(String::from).chain(new) {
        if !entry.is_empty() && !merged.contains(&entry) {
            merged.push(entry);
        }
    }
    merged.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CommandOutcome;
    use crate::testing::{FakeRunner, MemoryCache};

    #[test]
    fn test_should_cache_install_verbs() {
        for verb in ["install", "i", "add", "ci", "isntall"] {
            assert!(should_cache(verb, true), "{verb} should be cached");
        }
    }

    #[test]
    fn test_should_cache_other_commands() {
        assert!(!should_cache("test", true));
        assert!(!should_cache("test", false));
        assert!(!should_cache("run", true));
        assert!(!should_cache("Install", true));
    }

    #[test]
    fn test_should_cache_disabled() {
        assert!(!should_cache("install", false));
    }

    #[tokio::test]
    async fn test_mark_registers_dependency_dir_and_lock_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(temp_dir.path().join(DEPENDENCY_DIR)).unwrap();
        std::fs::write(temp_dir.path().join(LOCK_FILE), "{}").unwrap();

        let mut cache = MemoryCache::default();
        let outcome = mark_dependencies(temp_dir.path(), &mut cache).await.unwrap();

        let expected = vec![
            temp_dir.path().join(DEPENDENCY_DIR),
            temp_dir.path().join(LOCK_FILE),
        ];
        assert_eq!(outcome, CacheOutcome::Marked(expected.clone()));
        assert_eq!(cache.committed, expected);
    }

    #[tokio::test]
    async fn test_mark_without_lock_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(temp_dir.path().join(DEPENDENCY_DIR)).unwrap();

        let mut cache = MemoryCache::default();
        mark_dependencies(temp_dir.path(), &mut cache).await.unwrap();
        assert_eq!(cache.committed, vec![temp_dir.path().join(DEPENDENCY_DIR)]);
    }

    #[tokio::test]
    async fn test_mark_missing_dependency_dir_is_benign() {
        let temp_dir = tempfile::tempdir().unwrap();

        let mut cache = MemoryCache::default();
        let outcome = mark_dependencies(temp_dir.path(), &mut cache).await.unwrap();
        assert_eq!(outcome, CacheOutcome::NothingToCache);
        assert!(cache.committed.is_empty());
    }

    #[tokio::test]
    async fn test_mark_commit_failure() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(temp_dir.path().join(DEPENDENCY_DIR)).unwrap();

        let mut cache = MemoryCache {
            fail_commit: true,
            ..Default::default()
        };
        let err = mark_dependencies(temp_dir.path(), &mut cache).await.unwrap_err();
        assert!(matches!(err, StepError::Cache(_)));
    }

    #[test]
    fn test_merge_include_paths() {
        let merged = merge_include_paths(
            "/cache/a\n\n/proj/node_modules\n",
            &[PathBuf::from("/proj/node_modules"), PathBuf::from("/proj/package-lock.json")],
        );
        assert_eq!(merged, "/cache/a\n/proj/node_modules\n/proj/package-lock.json");
    }

    #[tokio::test]
    async fn test_envman_commit_exports_paths() {
        let runner = FakeRunner::default();
        let mut cache = EnvmanCache::new(&runner);
        cache.include_path(PathBuf::from("/proj/node_modules"));
        cache.commit().await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        let cmd = &calls[0].1;
        assert_eq!(cmd.program, "envman");
        assert_eq!(&cmd.args[..4], ["add", "--key", CACHE_INCLUDE_PATHS_ENV, "--value"]);
        assert!(cmd.args[4].lines().any(|l| l == "/proj/node_modules"));
    }

    #[tokio::test]
    async fn test_envman_commit_nothing_pending() {
        let runner = FakeRunner::default();
        EnvmanCache::new(&runner).commit().await.unwrap();
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_envman_commit_failure() {
        let paths = [PathBuf::from("/proj/node_modules")];
        let value = merge_include_paths(
            &std::env::var(CACHE_INCLUDE_PATHS_ENV).unwrap_or_default(),
            &paths,
        );
        let printable = CommandSpec::new("envman")
            .args(["add", "--key", CACHE_INCLUDE_PATHS_ENV, "--value"])
            .arg(value)
            .printable();
        let runner = FakeRunner::default().respond(
            &printable,
            CommandOutcome::new("envman: no envstore\nsee envman init --help", Some(1)),
        );

        let mut cache = EnvmanCache::new(&runner);
        cache.include_path(paths[0].clone());

        let err = cache.commit().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to mark dependencies for caching: envman failed with exit code 1"
        );
    }
}
