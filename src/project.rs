//! Function and project types, plus loading a project directory.
//!
//! A project directory looks like:
//!
//! ```text
//! project.json
//! functions/
//!   auth/function.json
//!   auth/index.js
//!   api/function.json
//!   ...
//! ```
//!
//! Each function inherits the project's default runtime and environment;
//! values from `function.json` win.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::ProjectError;
use crate::scheduler::SchedulerConfig;

/// Default number of concurrent deploys
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Default alias promoted after each deploy
pub const DEFAULT_ALIAS: &str = "current";

pub const PROJECT_FILE: &str = "project.json";
pub const FUNCTION_FILE: &str = "function.json";
pub const FUNCTIONS_DIR: &str = "functions";

/// Lifecycle of a function within one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildState {
    #[default]
    Unbuilt,
    Built,
    Deployed,
    Failed,
}

/// One independently deployable unit of code
#[derive(Debug, Clone)]
pub struct Function {
    /// Unique name within the project (the directory name)
    pub name: String,
    /// Runtime identifier (e.g., "nodejs20.x", "python3.12")
    pub runtime: String,
    /// Environment variables, order irrelevant
    pub environment: HashMap<String, String>,
    /// Source directory
    pub path: PathBuf,
    pub description: Option<String>,
    pub state: BuildState,
}

impl Function {
    pub fn new(name: &str, runtime: &str, path: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            runtime: runtime.to_string(),
            environment: HashMap::new(),
            path,
            description: None,
            state: BuildState::Unbuilt,
        }
    }

    pub fn setenv(&mut self, key: &str, value: &str) {
        self.environment.insert(key.to_string(), value.to_string());
    }
}

#[derive(Debug, Deserialize)]
struct ProjectFile {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    runtime: Option<String>,
    #[serde(default)]
    environment: HashMap<String, String>,
    #[serde(default)]
    concurrency: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct FunctionFile {
    #[serde(default)]
    runtime: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    environment: HashMap<String, String>,
}

/// All known functions plus invocation-wide settings
#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    pub description: Option<String>,
    /// Project root directory
    pub path: PathBuf,
    /// Ordered by name; names are unique
    pub functions: Vec<Function>,
    /// Always >= 1
    pub concurrency: usize,
    pub alias: String,
}

impl Project {
    /// Create an empty project rooted at `path`
    pub fn new(name: &str, path: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            path,
            functions: Vec::new(),
            concurrency: DEFAULT_CONCURRENCY,
            alias: DEFAULT_ALIAS.to_string(),
        }
    }

    /// Load `project.json` and every `functions/*/function.json` under `root`
    pub fn load(root: &Path) -> Result<Self, ProjectError> {
        let project_file = root.join(PROJECT_FILE);
        if !project_file.exists() {
            return Err(ProjectError::NotFound { path: project_file });
        }

        let config: ProjectFile = read_json(&project_file)?;
        let mut project = Project::new(&config.name, root.to_path_buf());
        project.description = config.description;
        project.concurrency = config.concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1);

        let default_runtime = config.runtime.unwrap_or_default();
        for (name, path, file) in read_function_dirs(&root.join(FUNCTIONS_DIR))? {
            let runtime = file.runtime.unwrap_or_else(|| default_runtime.clone());
            let mut function = Function::new(&name, &runtime, path);
            function.description = file.description;
            function.environment = config.environment.clone();
            function.environment.extend(file.environment);
            project.add_function(function)?;
        }

        debug!(
            project = %project.name,
            functions = project.functions.len(),
            "loaded project"
        );
        Ok(project)
    }

    /// Add a function, keeping names unique and the list ordered by name
    pub fn add_function(&mut self, function: Function) -> Result<(), ProjectError> {
        validate_function_name(&function.name)?;
        match self
            .functions
            .binary_search_by(|f| f.name.as_str().cmp(&function.name))
        {
            Ok(_) => Err(ProjectError::DuplicateFunction {
                name: function.name,
            }),
            Err(pos) => {
                self.functions.insert(pos, function);
                Ok(())
            }
        }
    }

    /// Set `key` to `value` in every function's environment
    pub fn setenv(&mut self, key: &str, value: &str) {
        for function in &mut self.functions {
            function.setenv(key, value);
        }
    }

    /// Scheduler settings for the current concurrency and alias
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::new(self.concurrency, &self.alias)
    }

    pub fn function_names(&self) -> Vec<&str> {
        self.functions.iter().map(|f| f.name.as_str()).collect()
    }
}

fn validate_function_name(name: &str) -> Result<(), ProjectError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ProjectError::InvalidFunctionName {
            name: name.to_string(),
        })
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ProjectError> {
    let content = fs::read_to_string(path).map_err(|e| ProjectError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| ProjectError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Read function directories sorted by name. Directories without a
/// `function.json` are skipped.
fn read_function_dirs(dir: &Path) -> Result<Vec<(String, PathBuf, FunctionFile)>, ProjectError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|e| ProjectError::Read {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut found = BTreeMap::new();
    for entry in entries {
        let entry = entry.map_err(|e| ProjectError::Read {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        let function_file = path.join(FUNCTION_FILE);
        let has_config = function_file
            .try_exists()
            .map_err(|e| ProjectError::Read {
                path: function_file.clone(),
                source: e,
            })?;
        if !has_config {
            debug!(function = %name, "skipping directory without {}", FUNCTION_FILE);
            continue;
        }

        let file: FunctionFile = read_json(&function_file)?;
        found.insert(name, (path, file));
    }

    Ok(found
        .into_iter()
        .map(|(name, (path, file))| (name, path, file))
        .collect())
}
