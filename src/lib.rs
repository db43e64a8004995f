//! # Function Deploy
//!
//! Deploys a project's independently packaged functions in one invocation.
//!
//! A deploy resolves which functions are in scope from names and glob
//! patterns, applies `KEY=VALUE` environment overrides to all of them, runs
//! each function's build → upload → alias pipeline under a concurrency
//! limit, and finally cleans up local build residue for the whole project.
//!
//! ## Features
//!
//! - Shell-style glob selection (`auth*`)
//! - Fail-fast input validation with no partial environment changes
//! - Bounded worker pool using Rayon, results in deterministic order
//! - Per-function fault isolation with an aggregate outcome
//! - Pluggable [`platform::Platform`] backend
//!
//! ## Usage
//!
//! ```ignore
//! use function_deploy::deployer::{deploy, DeployRequest};
//! use function_deploy::project::Project;
//! use function_deploy::store::DirectoryPlatform;
//!
//! let mut project = Project::load(&root)?;
//! let platform = DirectoryPlatform::for_project(&root);
//! let report = deploy(&mut project, &DeployRequest::default(), &platform, &ctx, |_| {})?;
//! ```

/// Post-deploy release of local build residue
pub mod cleanup;

/// CLI configuration and argument parsing
pub mod config;

/// File copying for artifact staging and publishing
pub mod copier;

/// Deploy orchestration entry points
pub mod deployer;

/// Error types for deployment operations
pub mod error;

/// Function selection by name and glob pattern
pub mod matcher;

/// Environment variable overrides
pub mod overlay;

/// Backend contract for build, upload, alias and cleanup
pub mod platform;

/// Functions, projects, and project loading
pub mod project;

/// Alias promotion
pub mod promoter;

/// Bounded-concurrency deploy fan-out
pub mod scheduler;

/// Directory-backed platform
pub mod store;
