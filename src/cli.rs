use clap::{ArgAction, Parser};

use crate::config::StepConfig;
use crate::error::Result;

#[derive(Parser, Debug)]
#[command(name = "npm-step")]
#[command(version)]
#[command(about = "Run an npm command with a pinned npm version")]
#[command(long_about = "Resolve the npm version (step input, package.json engines.npm, installed npm, \
or latest), make sure npm is installed at that version, run the given npm command and optionally \
mark node_modules for caching.\n\nEvery option can also be set through the environment variable \
shown next to it.")]
pub struct Cli {
    /// Working directory of the project
    #[arg(long, env = "workdir", default_value = ".")]
    pub workdir: String,

    /// npm command to run, e.g. "install" or "run build"
    #[arg(long, env = "command")]
    pub command: String,

    /// npm version to use; empty autodetects it
    #[arg(long, env = "npm_version")]
    pub npm_version: Option<String>,

    /// Mark node_modules for caching after an install command (true/false)
    #[arg(long, env = "cache_local_deps", default_value_t = false, action = ArgAction::Set)]
    pub cache_local_deps: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn into_config(self) -> Result<StepConfig> {
        StepConfig::new(
            &self.workdir,
            self.command,
            self.npm_version,
            self.cache_local_deps,
        )
    }
}
