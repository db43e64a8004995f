//! Alias promotion after a successful upload.

use tracing::debug;

use crate::error::StageError;
use crate::platform::{Platform, Version};
use crate::project::Function;

/// Point `alias` at the freshly uploaded `version` of `function`.
///
/// A failure here belongs to this function only. The uploaded version is
/// left in place; there is no rollback.
pub fn promote<P: Platform + ?Sized>(
    platform: &P,
    function: &Function,
    version: &Version,
    alias: &str,
) -> Result<(), StageError> {
    debug!(function = %function.name, %version, alias, "promoting alias");
    platform.promote(function, version, alias)
}
