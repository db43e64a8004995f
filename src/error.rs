use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that abort a deploy before any function work starts
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("No functions matched: {}", .patterns.join(", "))]
    NoMatchingFunctions { patterns: Vec<String> },

    #[error("Environment variable {token} needs a value (expected KEY=VALUE)")]
    InvalidEnvironmentAssignment { token: String },

    #[error("Invalid function pattern: {pattern}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Alias name must not be empty")]
    InvalidAlias,

    #[error(transparent)]
    Project(#[from] ProjectError),
}

/// Errors raised while loading a project directory
#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("Project file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid function name '{name}': only letters, digits, '-' and '_' are allowed")]
    InvalidFunctionName { name: String },

    #[error("Duplicate function name: {name}")]
    DuplicateFunction { name: String },
}

/// Errors from a single function's build, upload, alias, or cleanup stage.
/// These are recorded in the function's result and never abort sibling work.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("Function source directory not found: {path}")]
    SourceMissing { path: PathBuf },

    #[error("Artifact not found: {path}")]
    ArtifactMissing { path: PathBuf },

    #[error("No space left on device for {path}")]
    DiskFull { path: PathBuf },

    #[error("Failed to copy {src} to {dst}")]
    CopyFailed {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to create directory: {path}")]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove {path}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode {what}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Rejected(String),

    #[error("Deployment cancelled before start")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Secondary error: one or more functions could not release their local resources
#[derive(Error, Debug)]
#[error("Cleanup failed for {}", failed_names(.failures))]
pub struct CleanupError {
    pub failures: Vec<(String, StageError)>,
}

fn failed_names(failures: &[(String, StageError)]) -> String {
    failures
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
