//! Release of local build residue after a deploy.

use tracing::{debug, warn};

use crate::error::CleanupError;
use crate::platform::Platform;
use crate::project::Project;

/// Clean every function in the project, not only the ones just deployed,
/// since earlier invocations may have left residue behind.
///
/// A failing function does not stop the others; all failures are returned
/// together.
pub fn cleanup<P: Platform + ?Sized>(project: &Project, platform: &P) -> Result<(), CleanupError> {
    let mut failures = Vec::new();

    for function in &project.functions {
        if let Err(e) = platform.clean(function) {
            warn!(function = %function.name, "cleanup failed: {e}");
            failures.push((function.name.clone(), e));
        }
    }

    debug!(
        functions = project.functions.len(),
        failed = failures.len(),
        "cleanup finished"
    );

    if failures.is_empty() {
        Ok(())
    } else {
        Err(CleanupError { failures })
    }
}
