//! The remote execution platform seen from the deploy pipeline.
//!
//! Building, uploading, alias creation and local cleanup are owned by
//! a [`Platform`] implementation; the scheduler only sequences them.

use std::fmt;
use std::path::PathBuf;

use crate::error::StageError;
use crate::project::Function;

/// A built, deployable artifact for one function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Local location of the built artifact
    pub path: PathBuf,
    /// Number of files packaged
    pub file_count: u64,
    /// Total size in bytes
    pub bytes: u64,
}

/// Version identifier assigned by the platform on upload
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version(String);

impl Version {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Backend operations for one function. Implementations are shared across
/// worker threads; each call only concerns the function passed in.
pub trait Platform: Send + Sync {
    /// Package the function's sources into an artifact
    fn build(&self, function: &Function) -> Result<Artifact, StageError>;

    /// Publish an artifact, returning the new version
    fn upload(&self, function: &Function, artifact: &Artifact) -> Result<Version, StageError>;

    /// Point `alias` at `version`
    fn promote(&self, function: &Function, version: &Version, alias: &str)
        -> Result<(), StageError>;

    /// Release local build residue. Must succeed when there is nothing to remove.
    fn clean(&self, function: &Function) -> Result<(), StageError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory platform that records calls and injects failures.

    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    #[derive(Default)]
    pub struct RecordingPlatform {
        pub fail_build: HashSet<String>,
        pub fail_upload: HashSet<String>,
        pub fail_promote: HashSet<String>,
        pub fail_clean: HashSet<String>,
        pub delay: Duration,
        pub active: AtomicUsize,
        pub max_active: AtomicUsize,
        pub builds: AtomicUsize,
        pub uploads: AtomicUsize,
        pub promotes: AtomicUsize,
        pub cleans: AtomicUsize,
        pub promoted: Mutex<Vec<(String, String, String)>>,
        next_version: AtomicU64,
    }

    impl RecordingPlatform {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn failing_build(mut self, names: &[&str]) -> Self {
            self.fail_build = names.iter().map(|n| n.to_string()).collect();
            self
        }

        pub fn failing_upload(mut self, names: &[&str]) -> Self {
            self.fail_upload = names.iter().map(|n| n.to_string()).collect();
            self
        }

        pub fn failing_promote(mut self, names: &[&str]) -> Self {
            self.fail_promote = names.iter().map(|n| n.to_string()).collect();
            self
        }

        pub fn failing_clean(mut self, names: &[&str]) -> Self {
            self.fail_clean = names.iter().map(|n| n.to_string()).collect();
            self
        }

        fn leave(&self) {
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl Platform for RecordingPlatform {
        fn build(&self, function: &Function) -> Result<Artifact, StageError> {
            // A pipeline is active from build start until promote ends or a stage fails
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            self.builds.fetch_add(1, Ordering::SeqCst);

            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }

            if self.fail_build.contains(&function.name) {
                self.leave();
                return Err(StageError::Rejected(format!("build of {} failed", function.name)));
            }

            Ok(Artifact {
                path: PathBuf::from(format!("/build/{}", function.name)),
                file_count: 1,
                bytes: 1,
            })
        }

        fn upload(&self, function: &Function, _artifact: &Artifact) -> Result<Version, StageError> {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            if self.fail_upload.contains(&function.name) {
                self.leave();
                return Err(StageError::Rejected("upload refused".to_string()));
            }
            let n = self.next_version.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Version::new(n.to_string()))
        }

        fn promote(
            &self,
            function: &Function,
            version: &Version,
            alias: &str,
        ) -> Result<(), StageError> {
            self.promotes.fetch_add(1, Ordering::SeqCst);
            self.leave();
            if self.fail_promote.contains(&function.name) {
                return Err(StageError::Rejected("alias update refused".to_string()));
            }
            if let Ok(mut promoted) = self.promoted.lock() {
                promoted.push((
                    function.name.clone(),
                    version.to_string(),
                    alias.to_string(),
                ));
            }
            Ok(())
        }

        fn clean(&self, function: &Function) -> Result<(), StageError> {
            self.cleans.fetch_add(1, Ordering::SeqCst);
            if self.fail_clean.contains(&function.name) {
                return Err(StageError::Rejected("residue locked".to_string()));
            }
            Ok(())
        }
    }
}
