//! The step as an explicit sequence of stages.
//!
//! ```text
//! Resolve ─┬─> Install ─┐
//!          └────────────┴─> SetVersion ─> RunCommand ─┬─> MarkCache ─┐
//!                                                     └──────────────┴─> Done
//! ```
//!
//! Each stage runs to completion before the next one starts. A stage error
//! aborts the run, except in `MarkCache`, where it is only logged.

use crate::cache::{mark_dependencies, should_cache, BuildCache, CacheOutcome};
use crate::config::StepConfig;
use crate::error::Result;
use crate::executor::CommandExecutor;
use crate::installer;
use crate::locator::{PathLookup, ToolLocator};
use crate::manifest::ManifestSource;
use crate::process::ProcessRunner;
use crate::resolver::{Resolution, VersionResolver};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Install(Resolution),
    SetVersion(Resolution),
    RunCommand,
    /// Carries the first word of the user command.
    MarkCache(String),
    Done,
}

/// Host capabilities the stages run against.
pub struct StepContext<'a> {
    pub runner: &'a dyn ProcessRunner,
    pub lookup: &'a dyn PathLookup,
    pub manifests: &'a dyn ManifestSource,
    /// OS identifier used to pick the npm install command.
    pub os: &'a str,
}

/// What a successful run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub resolution: Option<Resolution>,
    pub installed: bool,
    pub cache: Option<CacheOutcome>,
}

pub struct Pipeline<'a> {
    config: &'a StepConfig,
    ctx: StepContext<'a>,
    cache: &'a mut dyn BuildCache,
    report: RunReport,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a StepConfig, ctx: StepContext<'a>, cache: &'a mut dyn BuildCache) -> Self {
        Self {
            config,
            ctx,
            cache,
            report: RunReport::default(),
        }
    }

    pub async fn run(mut self) -> Result<RunReport> {
        let mut stage = Stage::Resolve;
        while stage != Stage::Done {
            stage = self.advance(stage).await?;
        }
        Ok(self.report)
    }

    /// Run one stage and return the one that follows it.
    pub async fn advance(&mut self, stage: Stage) -> Result<Stage> {
        tracing::debug!("Stage: {:?}", stage);

        match stage {
            Stage::Resolve => {
                let locator = ToolLocator::new(self.ctx.lookup, self.ctx.runner);
                let resolution = VersionResolver::new(self.ctx.manifests, locator)
                    .resolve(self.config.npm_version.as_deref(), &self.config.workdir)
                    .await?;
                self.report.resolution = Some(resolution.clone());

                if resolution.install_required {
                    Ok(Stage::Install(resolution))
                } else {
                    Ok(Stage::SetVersion(resolution))
                }
            }
            Stage::Install(resolution) => {
                installer::install(self.ctx.runner, self.ctx.os).await?;
                self.report.installed = true;
                Ok(Stage::SetVersion(resolution))
            }
            Stage::SetVersion(resolution) => {
                CommandExecutor::new(self.ctx.runner)
                    .set_version(&resolution.version)
                    .await?;
                Ok(Stage::RunCommand)
            }
            Stage::RunCommand => {
                let args = &self.config.args;
                CommandExecutor::new(self.ctx.runner)
                    .run_user_command(args, &self.config.workdir)
                    .await?;

                let verb = args.first().cloned().unwrap_or_default();
                if should_cache(&verb, self.config.cache_local_deps) {
                    Ok(Stage::MarkCache(verb))
                } else {
                    tracing::debug!("Skipping dependency caching for '{}'", verb);
                    Ok(Stage::Done)
                }
            }
            Stage::MarkCache(verb) => {
                tracing::info!("Caching dependencies after 'npm {}'", verb);
                match mark_dependencies(&self.config.workdir, &mut *self.cache).await {
                    Ok(outcome) => self.report.cache = Some(outcome),
                    Err(e) => tracing::warn!("{}", e),
                }
                Ok(Stage::Done)
            }
            Stage::Done => Ok(Stage::Done),
        }
    }
}
