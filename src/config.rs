//! CLI configuration and runtime settings for a deploy invocation.

use clap::Parser;
use std::path::PathBuf;

use crate::deployer::DeployRequest;
use crate::project::DEFAULT_ALIAS;
use crate::store::STORE_DIR;

const EXAMPLES: &str = "Examples:
  Deploy all functions
  $ function-deploy

  Deploy specific functions
  $ function-deploy foo bar

  Deploy canary alias
  $ function-deploy foo --alias canary

  Deploy functions in a different project
  $ function-deploy -C ~/dev/myapp

  Deploy all functions starting with \"auth\"
  $ function-deploy 'auth*'";

/// Deploy functions and config
#[derive(Parser, Debug)]
#[command(name = "function-deploy")]
#[command(version)]
#[command(about = "Deploy functions and config")]
#[command(after_help = EXAMPLES)]
pub struct Cli {
    /// Function names or glob patterns (default: all functions)
    #[arg(value_name = "NAME")]
    pub names: Vec<String>,

    /// Set environment variable (KEY=VALUE, repeatable)
    #[arg(short = 's', long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Function alias
    #[arg(short, long, default_value = DEFAULT_ALIAS)]
    pub alias: String,

    /// Concurrent deploys (default: project setting, else 5)
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Project directory
    #[arg(short = 'C', long = "chdir", default_value = ".")]
    pub project_dir: PathBuf,

    /// Directory versions and aliases are published to (default: <project>/.deploy)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Runtime configuration parsed from CLI
#[derive(Debug, Clone)]
pub struct Config {
    /// Project root directory
    pub project_dir: PathBuf,
    /// Publish target
    pub store: PathBuf,
    /// Requested names/patterns (empty = all)
    pub patterns: Vec<String>,
    /// Raw KEY=VALUE overrides, validated before deploying
    pub overrides: Vec<String>,
    /// Concurrency limit (>= 1); None keeps the project's setting
    pub concurrency: Option<usize>,
    /// Alias promoted after each deploy
    pub alias: String,
    /// Enable verbose output
    pub verbose: bool,
}

impl Config {
    /// Create Config from CLI arguments
    pub fn from_cli(cli: Cli) -> anyhow::Result<Self> {
        let project_dir = cli.project_dir.canonicalize().unwrap_or(cli.project_dir);

        if cli.alias.trim().is_empty() {
            anyhow::bail!("alias must not be empty");
        }

        let store = cli.store.unwrap_or_else(|| project_dir.join(STORE_DIR));

        Ok(Config {
            project_dir,
            store,
            patterns: cli.names,
            overrides: cli.set,
            concurrency: cli.concurrency.map(|c| c.max(1)),
            alias: cli.alias,
            verbose: cli.verbose,
        })
    }

    pub fn request(&self) -> DeployRequest {
        DeployRequest {
            patterns: self.patterns.clone(),
            overrides: self.overrides.clone(),
            concurrency: self.concurrency,
            alias: self.alias.clone(),
        }
    }
}
