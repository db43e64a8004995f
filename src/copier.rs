use std::ffi::OsStr;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path};
use walkdir::WalkDir;

use crate::error::StageError;
use crate::project::FUNCTION_FILE;

/// ENOSPC on Unix
const DISK_FULL: i32 = 28;

/// Extensions never packaged into an artifact
const DEV_EXTENSIONS: &[&str] = &[
    "md",       // Markdown docs
    "markdown", // Markdown docs
    "lock",     // Lock files
    "log",      // Local logs
    "swp",      // Editor swap files
];

/// Files never packaged into an artifact
const DEV_FILES: &[&str] = &[
    FUNCTION_FILE,
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "README",
    "README.md",
    "CHANGELOG.md",
    ".gitignore",
    ".npmignore",
    ".npmrc",
    ".editorconfig",
    ".DS_Store",
];

/// Directories never packaged into an artifact
const DEV_DIRECTORIES: &[&str] = &[".git", ".svn", ".hg", "__pycache__", ".pytest_cache"];

/// Check if a path under the function root should be left out of the artifact
#[inline]
fn should_exclude(relative: &Path) -> bool {
    for component in relative.components() {
        if let Component::Normal(name) = component {
            if let Some(name_str) = name.to_str() {
                if DEV_DIRECTORIES.contains(&name_str) {
                    return true;
                }
            }
        }
    }

    if let Some(file_name) = relative.file_name().and_then(OsStr::to_str) {
        if DEV_FILES.contains(&file_name) {
            return true;
        }
    }

    if let Some(ext) = relative.extension().and_then(OsStr::to_str) {
        let ext_lower = ext.to_lowercase();
        if DEV_EXTENSIONS.contains(&ext_lower.as_str()) {
            return true;
        }
    }

    false
}

fn create_dir(path: &Path) -> Result<(), StageError> {
    fs::create_dir_all(path).map_err(|e| {
        if e.raw_os_error() == Some(DISK_FULL) {
            return StageError::DiskFull {
                path: path.to_path_buf(),
            };
        }
        StageError::CreateDirFailed {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

/// Copy a single file from src to dst, creating parent directories
pub fn copy_file(src: &Path, dst: &Path) -> Result<u64, StageError> {
    if let Some(parent) = dst.parent() {
        if !parent.exists() {
            create_dir(parent)?;
        }
    }

    fs::copy(src, dst).map_err(|e| {
        if e.raw_os_error() == Some(DISK_FULL) {
            return StageError::DiskFull {
                path: dst.to_path_buf(),
            };
        }
        StageError::CopyFailed {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            source: e,
        }
    })
}

/// Copy a directory tree, returns (files_copied, bytes_copied).
/// With `filter_dev` set, development files are skipped.
pub fn copy_directory(src: &Path, dst: &Path, filter_dev: bool) -> Result<(u64, u64), StageError> {
    let mut files_copied = 0u64;
    let mut bytes_copied = 0u64;

    create_dir(dst)?;

    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.map_err(|e| StageError::Walk {
            path: e.path().unwrap_or(src).to_path_buf(),
            source: e,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let src_path = entry.path();
        let relative = src_path.strip_prefix(src).unwrap_or(src_path);

        if filter_dev && should_exclude(relative) {
            continue;
        }

        let bytes = copy_file(src_path, &dst.join(relative))?;
        files_copied += 1;
        bytes_copied += bytes;
    }

    Ok((files_copied, bytes_copied))
}

/// Remove a directory tree. A missing directory counts as removed.
pub fn remove_directory(path: &Path) -> Result<bool, StageError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StageError::RemoveFailed {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
