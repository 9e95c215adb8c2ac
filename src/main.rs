mod cache;
mod cli;
mod config;
mod error;
mod executor;
mod installer;
mod locator;
mod manifest;
mod pipeline;
mod process;
mod resolver;
#[cfg(test)]
mod testing;

use std::process::ExitCode;

use clap::Parser;
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cache::{CacheOutcome, EnvmanCache};
use cli::Cli;
use error::Result;
use locator::WhichLookup;
use manifest::FsManifestSource;
use pipeline::{Pipeline, RunReport, StepContext};
use process::SystemRunner;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let default_filter = if cli.verbose {
        "npm_step=debug"
    } else {
        "npm_step=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    match run(cli).await {
        Ok(report) => {
            log_report(&report);
            println!("{}", style("✓ Step success").green().bold());
            ExitCode::SUCCESS
        }
        Err(e) => {
            if let Some(output) = e.process_output() {
                tracing::info!("Command output:\n{}", output);
            }
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<RunReport> {
    let config = cli.into_config()?;
    config.log_summary();

    let runner = SystemRunner;
    let mut cache = EnvmanCache::new(&runner);
    let ctx = StepContext {
        runner: &runner,
        lookup: &WhichLookup,
        manifests: &FsManifestSource,
        os: std::env::consts::OS,
    };

    Pipeline::new(&config, ctx, &mut cache).run().await
}

fn log_report(report: &RunReport) {
    if let Some(ref resolution) = report.resolution {
        tracing::info!(
            "npm {} (source: {:?}, installed by step: {})",
            resolution.version,
            resolution.source,
            report.installed
        );
    }
    if let Some(CacheOutcome::Marked(ref paths)) = report.cache {
        for path in paths {
            tracing::info!("Cached: {}", path.display());
        }
    }
}
