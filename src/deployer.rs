//! Deploy orchestration: select, override, fan out, clean up.
//!
//! Input problems (bad patterns, malformed `KEY=VALUE`, empty alias) are
//! rejected by [`prepare`] before anything is built or any environment is
//! modified. [`deploy_and_clean`] then never fails as a whole: per-function
//! errors land in the aggregate result and cleanup errors are reported
//! alongside it.

use tracing::{debug, warn};

use crate::cleanup::cleanup;
use crate::error::{CleanupError, DeployError, StageError};
use crate::matcher::{resolve, DeploySet};
use crate::overlay::apply_overrides;
use crate::platform::Platform;
use crate::project::{Project, DEFAULT_ALIAS};
use crate::scheduler::{run, AggregateResult, DeployResult, DeployStatus, Outcome, RunContext};

/// Exit code for an invocation interrupted by Ctrl+C
pub const EXIT_CANCELLED: u8 = 130;

/// Everything the caller asked for in one invocation
#[derive(Debug, Clone)]
pub struct DeployRequest {
    /// Function names or glob patterns; empty means all
    pub patterns: Vec<String>,
    /// `KEY=VALUE` environment overrides
    pub overrides: Vec<String>,
    /// Overrides the project's concurrency when set
    pub concurrency: Option<usize>,
    /// Alias promoted to each new version
    pub alias: String,
}

impl Default for DeployRequest {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            overrides: Vec::new(),
            concurrency: None,
            alias: DEFAULT_ALIAS.to_string(),
        }
    }
}

/// Aggregate deploy result plus any secondary cleanup error
#[derive(Debug)]
pub struct DeployReport {
    pub aggregate: AggregateResult,
    pub cleanup_error: Option<CleanupError>,
}

impl DeployReport {
    /// True when at least one function was skipped because of Ctrl+C
    pub fn cancelled(&self) -> bool {
        self.aggregate.results.iter().any(|r| {
            matches!(
                r.status,
                DeployStatus::Failed {
                    error: StageError::Cancelled,
                    ..
                }
            )
        })
    }

    /// 0 when everything succeeded, 1 on partial failure or cleanup error,
    /// 2 when every function failed, 130 when Ctrl+C skipped any function
    pub fn exit_code(&self) -> u8 {
        if self.cancelled() {
            return EXIT_CANCELLED;
        }
        match self.aggregate.outcome {
            Outcome::AllFailed => 2,
            Outcome::PartialFailure => 1,
            Outcome::AllSucceeded if self.cleanup_error.is_some() => 1,
            Outcome::AllSucceeded => 0,
        }
    }
}

/// Validate the request, select functions and apply environment overrides.
///
/// The requested concurrency and alias are stored on the project; without a
/// requested concurrency the project's own setting stays. On error the
/// project is left untouched.
pub fn prepare(project: &mut Project, request: &DeployRequest) -> Result<DeploySet, DeployError> {
    if request.alias.trim().is_empty() {
        return Err(DeployError::InvalidAlias);
    }

    let deploy_set = resolve(&project.functions, &request.patterns)?;
    apply_overrides(&mut project.functions, &deploy_set, &request.overrides)?;

    if let Some(concurrency) = request.concurrency {
        project.concurrency = concurrency.max(1);
    }
    project.alias = request.alias.clone();

    debug!(
        selected = ?deploy_set.names(&project.functions),
        overrides = request.overrides.len(),
        concurrency = project.concurrency,
        "prepared deploy"
    );
    Ok(deploy_set)
}

/// Deploy `deploy_set` with the project's concurrency and alias, then clean
/// up every function in the project exactly once
pub fn deploy_and_clean<P, F>(
    project: &mut Project,
    deploy_set: &DeploySet,
    platform: &P,
    ctx: &RunContext<'_>,
    on_result: F,
) -> DeployReport
where
    P: Platform + ?Sized,
    F: Fn(&DeployResult) + Sync,
{
    let config = project.scheduler_config();
    let aggregate = run(
        &mut project.functions,
        deploy_set,
        &config,
        platform,
        ctx,
        on_result,
    );

    let cleanup_error = cleanup(project, platform).err();
    if let Some(e) = &cleanup_error {
        warn!("{e}");
    }

    DeployReport {
        aggregate,
        cleanup_error,
    }
}

/// [`prepare`] followed by [`deploy_and_clean`]
pub fn deploy<P, F>(
    project: &mut Project,
    request: &DeployRequest,
    platform: &P,
    ctx: &RunContext<'_>,
    on_result: F,
) -> Result<DeployReport, DeployError>
where
    P: Platform + ?Sized,
    F: Fn(&DeployResult) + Sync,
{
    let deploy_set = prepare(project, request)?;
    Ok(deploy_and_clean(
        project,
        &deploy_set,
        platform,
        ctx,
        on_result,
    ))
}
