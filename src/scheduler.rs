//! Bounded-concurrency fan-out of per-function deploys.
//!
//! Each selected function runs build → upload → promote on one worker of a
//! dedicated pool sized to the concurrency limit. A failing stage marks only
//! that function as failed; everything else keeps going. Results come back in
//! deploy-set order regardless of completion order.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::StageError;
use crate::matcher::DeploySet;
use crate::platform::{Platform, Version};
use crate::project::{BuildState, Function, DEFAULT_ALIAS, DEFAULT_CONCURRENCY};
use crate::promoter::promote;

/// Immutable per-invocation settings handed to every worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum number of pipelines in flight, at least 1
    pub concurrency: usize,
    /// Alias promoted to each new version
    pub alias: String,
}

impl SchedulerConfig {
    pub fn new(concurrency: usize, alias: &str) -> Self {
        Self {
            concurrency: concurrency.max(1),
            alias: alias.to_string(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY, DEFAULT_ALIAS)
    }
}

/// Pipeline stage a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Build,
    Upload,
    Promote,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Build => "build",
            Stage::Upload => "upload",
            Stage::Promote => "alias",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deployment outcome for one function
#[derive(Debug)]
pub enum DeployStatus {
    /// Built, uploaded and aliased
    Success { version: Version },
    /// Failed at `stage`
    Failed { stage: Stage, error: StageError },
}

/// Result of one function's pipeline
#[derive(Debug)]
pub struct DeployResult {
    pub function: String,
    pub status: DeployStatus,
    /// Time taken for this function
    pub duration: Duration,
}

impl DeployResult {
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self.status, DeployStatus::Success { .. })
    }
}

/// Overall outcome of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    AllSucceeded,
    PartialFailure,
    AllFailed,
}

/// Every function's result in deploy-set order, plus the overall outcome
#[derive(Debug)]
pub struct AggregateResult {
    pub results: Vec<DeployResult>,
    pub outcome: Outcome,
}

impl AggregateResult {
    /// Compute the outcome. An empty result set counts as all succeeded.
    pub fn from_results(results: Vec<DeployResult>) -> Self {
        let failed = results.iter().filter(|r| !r.is_success()).count();
        let outcome = if failed == 0 {
            Outcome::AllSucceeded
        } else if failed == results.len() {
            Outcome::AllFailed
        } else {
            Outcome::PartialFailure
        };

        Self { results, outcome }
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// Live counters updated by workers as functions finish, read by the
/// progress display while the deploy is still running
#[derive(Debug)]
pub struct DeployStats {
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl DeployStats {
    pub fn new() -> Self {
        Self {
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub fn record(&self, result: &DeployResult) {
        let counter = if result.is_success() {
            &self.succeeded
        } else {
            &self.failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn finished(&self) -> u64 {
        self.succeeded() + self.failed()
    }
}

impl Default for DeployStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared state observed by workers
pub struct RunContext<'a> {
    /// Checked before a pipeline starts; started pipelines run to completion
    pub shutdown: &'a AtomicBool,
    pub stats: &'a DeployStats,
}

/// Deploy every function in `deploy_set`.
///
/// Work runs on a pool of exactly `config.concurrency` threads. The indexed
/// parallel collect writes each result into its own slot, so the returned
/// order matches `deploy_set`. Returns once every function has a result.
/// `on_result` is called from the worker as each function finishes.
pub fn run<P, F>(
    functions: &mut [Function],
    deploy_set: &DeploySet,
    config: &SchedulerConfig,
    platform: &P,
    ctx: &RunContext<'_>,
    on_result: F,
) -> AggregateResult
where
    P: Platform + ?Sized,
    F: Fn(&DeployResult) + Sync,
{
    debug_assert!(
        deploy_set.indices().iter().all(|&i| i < functions.len()),
        "deploy set index out of range for {} functions",
        functions.len()
    );

    let mut selected: Vec<&mut Function> = functions
        .iter_mut()
        .enumerate()
        .filter(|(i, _)| deploy_set.contains(*i))
        .map(|(_, f)| f)
        .collect();

    debug!(
        functions = selected.len(),
        concurrency = config.concurrency,
        alias = %config.alias,
        "starting deploy"
    );

    let work = |function: &mut Function| {
        let result = deploy_function(function, &config.alias, platform, ctx.shutdown);
        ctx.stats.record(&result);
        on_result(&result);
        result
    };

    let results: Vec<DeployResult> = match rayon::ThreadPoolBuilder::new()
        .num_threads(config.concurrency)
        .thread_name(|i| format!("deploy-{i}"))
        .build()
    {
        Ok(pool) => pool.install(|| {
            selected
                .par_iter_mut()
                .map(|function| work(&mut **function))
                .collect()
        }),
        Err(e) => {
            warn!("failed to start worker pool, deploying sequentially: {e}");
            selected
                .iter_mut()
                .map(|function| work(&mut **function))
                .collect()
        }
    };

    AggregateResult::from_results(results)
}

/// Run one function's pipeline, recording its state transitions
pub fn deploy_function<P: Platform + ?Sized>(
    function: &mut Function,
    alias: &str,
    platform: &P,
    shutdown: &AtomicBool,
) -> DeployResult {
    let start = Instant::now();

    let status = if shutdown.load(Ordering::Relaxed) {
        DeployStatus::Failed {
            stage: Stage::Build,
            error: StageError::Cancelled,
        }
    } else {
        match pipeline(function, alias, platform) {
            Ok(version) => DeployStatus::Success { version },
            Err((stage, error)) => DeployStatus::Failed { stage, error },
        }
    };

    let duration = start.elapsed();
    match &status {
        DeployStatus::Success { version } => {
            function.state = BuildState::Deployed;
            info!(function = %function.name, %version, ?duration, "deployed");
        }
        DeployStatus::Failed { stage, error } => {
            function.state = BuildState::Failed;
            warn!(function = %function.name, %stage, "deploy failed: {error}");
        }
    }

    DeployResult {
        function: function.name.clone(),
        status,
        duration,
    }
}

fn pipeline<P: Platform + ?Sized>(
    function: &mut Function,
    alias: &str,
    platform: &P,
) -> Result<Version, (Stage, StageError)> {
    debug!(function = %function.name, runtime = %function.runtime, "building");
    let artifact = platform
        .build(function)
        .map_err(|e| (Stage::Build, e))?;
    function.state = BuildState::Built;

    debug!(function = %function.name, files = artifact.file_count, "uploading");
    let version = platform
        .upload(function, &artifact)
        .map_err(|e| (Stage::Upload, e))?;

    promote(platform, function, &version, alias).map_err(|e| (Stage::Promote, e))?;

    Ok(version)
}
