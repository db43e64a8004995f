//! Resolves requested names and glob patterns into the set of functions to deploy.

use glob::Pattern;

use crate::error::DeployError;
use crate::project::Function;

/// Positions of the selected functions within the project's function list.
/// Always in project order with no duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploySet {
    indices: Vec<usize>,
}

impl DeploySet {
    /// Every function in `functions`
    pub fn all(functions: &[Function]) -> Self {
        Self {
            indices: (0..functions.len()).collect(),
        }
    }

    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.indices.binary_search(&index).is_ok()
    }

    /// Names of the selected functions, in deploy order
    pub fn names<'a>(&self, functions: &'a [Function]) -> Vec<&'a str> {
        self.indices
            .iter()
            .filter_map(|&i| functions.get(i))
            .map(|f| f.name.as_str())
            .collect()
    }
}

/// Glob patterns compiled once, matched against many names
#[derive(Debug)]
pub struct CompiledPatterns {
    sources: Vec<String>,
    patterns: Vec<Pattern>,
}

impl CompiledPatterns {
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self, DeployError> {
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = Pattern::new(pattern).map_err(|e| DeployError::InvalidPattern {
                pattern: pattern.to_string(),
                source: e,
            })?;
            compiled.push(glob);
        }

        Ok(Self {
            sources: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            patterns: compiled,
        })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Case-sensitive match of `name` against any pattern
    pub fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(name))
    }
}

/// Select the functions to deploy.
///
/// No patterns selects everything. A pattern that matches nothing is fine
/// as long as the patterns together match at least one function.
pub fn resolve<S: AsRef<str>>(
    functions: &[Function],
    requested: &[S],
) -> Result<DeploySet, DeployError> {
    if requested.is_empty() {
        return Ok(DeploySet::all(functions));
    }

    let patterns = CompiledPatterns::compile(requested)?;
    let indices: Vec<usize> = functions
        .iter()
        .enumerate()
        .filter(|(_, f)| patterns.matches(&f.name))
        .map(|(i, _)| i)
        .collect();

    if indices.is_empty() {
        return Err(DeployError::NoMatchingFunctions {
            patterns: patterns.sources,
        });
    }

    Ok(DeploySet { indices })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn functions(names: &[&str]) -> Vec<Function> {
        names
            .iter()
            .map(|n| Function::new(n, "nodejs20.x", PathBuf::from(n)))
            .collect()
    }

    // ==================== resolve tests ====================

    #[test]
    fn test_resolve_no_patterns_selects_all_in_order() {
        let fns = functions(&["zeta", "alpha", "mid"]);
        let set = resolve::<&str>(&fns, &[]).unwrap();
        assert_eq!(set.names(&fns), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_resolve_empty_project_no_patterns() {
        let set = resolve::<&str>(&[], &[]).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_resolve_exact_names() {
        let fns = functions(&["api", "auth", "worker"]);
        let set = resolve(&fns, &["worker", "api"]).unwrap();
        // Project order, not pattern order
        assert_eq!(set.names(&fns), vec!["api", "worker"]);
    }

    #[test]
    fn test_resolve_glob_prefix() {
        let fns = functions(&["auth-login", "api", "auth-logout"]);
        let set = resolve(&fns, &["auth*"]).unwrap();
        assert_eq!(set.names(&fns), vec!["auth-login", "auth-logout"]);
    }

    #[test]
    fn test_resolve_overlapping_patterns_deduplicated() {
        let fns = functions(&["auth-login", "auth-logout", "api"]);
        let set = resolve(&fns, &["auth*", "auth-login", "*login"]).unwrap();
        assert_eq!(set.names(&fns), vec!["auth-login", "auth-logout"]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_resolve_unmatched_pattern_is_not_error_alone() {
        let fns = functions(&["api"]);
        let set = resolve(&fns, &["nothing*", "api"]).unwrap();
        assert_eq!(set.names(&fns), vec!["api"]);
    }

    #[test]
    fn test_resolve_no_match_fails() {
        let fns = functions(&["api", "auth"]);
        let result = resolve(&fns, &["worker*", "db"]);
        match result {
            Err(DeployError::NoMatchingFunctions { patterns }) => {
                assert_eq!(patterns, vec!["worker*", "db"]);
            }
            other => panic!("expected NoMatchingFunctions, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_patterns_on_empty_project_fails() {
        let result = resolve::<&str>(&[], &["*"]);
        assert!(matches!(
            result,
            Err(DeployError::NoMatchingFunctions { .. })
        ));
    }

    #[test]
    fn test_resolve_case_sensitive() {
        let fns = functions(&["Api"]);
        assert!(resolve(&fns, &["api"]).is_err());
        assert!(resolve(&fns, &["A*"]).is_ok());
    }

    #[test]
    fn test_resolve_invalid_pattern() {
        let fns = functions(&["api"]);
        let result = resolve(&fns, &["[api"]);
        assert!(matches!(result, Err(DeployError::InvalidPattern { .. })));
    }

    // ==================== DeploySet tests ====================

    #[test]
    fn test_deploy_set_contains() {
        let fns = functions(&["a", "b", "c"]);
        let set = resolve(&fns, &["a", "c"]).unwrap();
        assert!(set.contains(0));
        assert!(!set.contains(1));
        assert!(set.contains(2));
    }

    #[test]
    fn test_compiled_patterns_star_matches_everything() {
        let patterns = CompiledPatterns::compile(&["*"]).unwrap();
        assert!(patterns.matches("anything"));
        assert!(patterns.matches(""));
        assert!(!patterns.is_empty());
    }
}
