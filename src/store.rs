//! A [`Platform`] that publishes into a local directory.
//!
//! Layout under the store root:
//!
//! ```text
//! <store>/<function>/versions/<n>/...   published artifacts, n = 1, 2, ...
//! <store>/<function>/aliases/<alias>    file containing the aliased version
//! ```
//!
//! Artifacts are staged under `<build_root>/<function>/` and removed by `clean`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::copier::{copy_directory, remove_directory};
use crate::error::StageError;
use crate::platform::{Artifact, Platform, Version};
use crate::project::Function;

/// Environment file written into every artifact
pub const ENV_FILE: &str = "function.env.json";

/// Runtime marker written into every artifact
pub const RUNTIME_FILE: &str = "function.runtime";

/// Staging directory name under the project root
pub const BUILD_DIR: &str = ".build";

/// Default store directory name under the project root
pub const STORE_DIR: &str = ".deploy";

#[derive(Debug, Clone)]
pub struct DirectoryPlatform {
    build_root: PathBuf,
    store: PathBuf,
}

impl DirectoryPlatform {
    pub fn new(build_root: PathBuf, store: PathBuf) -> Self {
        Self { build_root, store }
    }

    /// Staging and store directories inside the project root
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(BUILD_DIR), project_root.join(STORE_DIR))
    }

    pub fn store(&self) -> &Path {
        &self.store
    }

    pub fn staging_path(&self, function: &Function) -> PathBuf {
        self.build_root.join(&function.name)
    }

    fn versions_path(&self, name: &str) -> PathBuf {
        self.store.join(name).join("versions")
    }

    fn aliases_path(&self, name: &str) -> PathBuf {
        self.store.join(name).join("aliases")
    }

    /// Highest published version number for a function, 0 if none
    pub fn latest_version(&self, name: &str) -> u64 {
        fs::read_dir(self.versions_path(name))
            .ok()
            .into_iter()
            .flat_map(|rd| rd.filter_map(|e| e.ok()))
            .filter_map(|e| e.file_name().to_str().and_then(|s| s.parse::<u64>().ok()))
            .max()
            .unwrap_or(0)
    }

    /// Read the version an alias points at
    pub fn read_alias(&self, name: &str, alias: &str) -> Option<Version> {
        fs::read_to_string(self.aliases_path(name).join(alias))
            .ok()
            .map(|s| Version::new(s.trim()))
    }
}

fn write_file(path: &Path, content: &str) -> Result<u64, StageError> {
    fs::write(path, content).map_err(|e| StageError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(content.len() as u64)
}

impl Platform for DirectoryPlatform {
    fn build(&self, function: &Function) -> Result<Artifact, StageError> {
        if !function.path.is_dir() {
            return Err(StageError::SourceMissing {
                path: function.path.clone(),
            });
        }

        let staging = self.staging_path(function);
        // Residue from an earlier run would leak into the artifact
        remove_directory(&staging)?;

        let (mut file_count, mut bytes) = copy_directory(&function.path, &staging, true)?;

        let environment: BTreeMap<&str, &str> = function
            .environment
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let env_json =
            serde_json::to_string_pretty(&environment).map_err(|e| StageError::Encode {
                what: "environment",
                source: e,
            })?;

        bytes += write_file(&staging.join(ENV_FILE), &env_json)?;
        bytes += write_file(&staging.join(RUNTIME_FILE), &function.runtime)?;
        file_count += 2;

        debug!(function = %function.name, files = file_count, bytes, "staged artifact");

        Ok(Artifact {
            path: staging,
            file_count,
            bytes,
        })
    }

    fn upload(&self, function: &Function, artifact: &Artifact) -> Result<Version, StageError> {
        if !artifact.path.is_dir() {
            return Err(StageError::ArtifactMissing {
                path: artifact.path.clone(),
            });
        }

        let next = self.latest_version(&function.name) + 1;
        let target = self.versions_path(&function.name).join(next.to_string());
        copy_directory(&artifact.path, &target, false)?;

        debug!(function = %function.name, version = next, "published version");
        Ok(Version::new(next.to_string()))
    }

    fn promote(
        &self,
        function: &Function,
        version: &Version,
        alias: &str,
    ) -> Result<(), StageError> {
        let published = self.versions_path(&function.name).join(version.as_str());
        if !published.is_dir() {
            return Err(StageError::Rejected(format!(
                "version {} of {} is not published",
                version, function.name
            )));
        }

        let aliases = self.aliases_path(&function.name);
        fs::create_dir_all(&aliases).map_err(|e| StageError::CreateDirFailed {
            path: aliases.clone(),
            source: e,
        })?;

        // Write then rename so readers never see a partial pointer
        let pointer = aliases.join(alias);
        let tmp = aliases.join(format!(".{alias}.tmp"));
        write_file(&tmp, version.as_str())?;
        fs::rename(&tmp, &pointer).map_err(|e| StageError::WriteFailed {
            path: pointer,
            source: e,
        })?;
        Ok(())
    }

    fn clean(&self, function: &Function) -> Result<(), StageError> {
        if remove_directory(&self.staging_path(function))? {
            debug!(function = %function.name, "removed staged artifact");
        }
        Ok(())
    }
}
