use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use function_deploy::config::{Cli, Config};
use function_deploy::deployer::{deploy_and_clean, prepare, EXIT_CANCELLED};
use function_deploy::project::Project;
use function_deploy::scheduler::{DeployStats, DeployStatus, RunContext};
use function_deploy::store::{DirectoryPlatform, BUILD_DIR};

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "warn,function_deploy=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::from_cli(cli)?;
    init_logging(config.verbose);

    let mut project = Project::load(&config.project_dir).with_context(|| {
        format!("Failed to load project in {}", config.project_dir.display())
    })?;

    let request = config.request();
    let deploy_set = prepare(&mut project, &request)?;

    // Setup Ctrl+C handler
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    ctrlc::set_handler(move || {
        shutdown_clone.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    info!(
        project = %project.name,
        functions = deploy_set.len(),
        concurrency = project.concurrency,
        alias = %project.alias,
        "deploying"
    );

    // Progress bar only in verbose mode
    let progress = if config.verbose {
        let pb = ProgressBar::new(deploy_set.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let platform = DirectoryPlatform::new(project.path.join(BUILD_DIR), config.store.clone());
    let stats = DeployStats::new();
    let ctx = RunContext {
        shutdown: shutdown.as_ref(),
        stats: &stats,
    };

    let start = Instant::now();
    let report = deploy_and_clean(
        &mut project,
        &deploy_set,
        &platform,
        &ctx,
        |result| {
            if let Some(ref pb) = progress {
                pb.set_position(stats.finished());
                pb.set_message(format!(
                    "{} ({} ok, {} failed)",
                    result.function,
                    stats.succeeded(),
                    stats.failed()
                ));
            }
        },
    );

    if let Some(pb) = progress {
        pb.finish_with_message("done");
    }

    let duration = start.elapsed();
    println!(
        "Deployed {}/{} function(s) in {:.2}s",
        stats.succeeded(),
        stats.finished(),
        duration.as_secs_f64()
    );

    // Every attempted function appears here
    for result in &report.aggregate.results {
        let status_str = match &result.status {
            DeployStatus::Success { version } => {
                format!("version {} ({})", version, project.alias)
            }
            DeployStatus::Failed { stage, error } => format!("FAILED at {stage}: {error}"),
        };

        println!(
            "  {}: {} [{:.2}s]",
            result.function,
            status_str,
            result.duration.as_secs_f64()
        );
    }

    if let Some(ref e) = report.cleanup_error {
        eprintln!("Warning: {e}");
        for (name, error) in &e.failures {
            eprintln!("  {name}: {error}");
        }
    }

    let code = report.exit_code();
    if code == EXIT_CANCELLED {
        eprintln!("\nDeployment cancelled");
    }

    Ok(ExitCode::from(code))
}
