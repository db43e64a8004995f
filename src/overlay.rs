//! `KEY=VALUE` environment overrides applied to every function being deployed.

use std::fmt;

use crate::error::DeployError;
use crate::matcher::DeploySet;
use crate::project::Function;

/// One parsed `KEY=VALUE` override
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvAssignment {
    pub key: String,
    pub value: String,
}

impl EnvAssignment {
    /// Split on the first `=` only, so values may contain `=`
    pub fn parse(token: &str) -> Result<Self, DeployError> {
        match token.split_once('=') {
            Some((key, value)) => Ok(Self {
                key: key.to_string(),
                value: value.to_string(),
            }),
            None => Err(DeployError::InvalidEnvironmentAssignment {
                token: token.to_string(),
            }),
        }
    }
}

impl fmt::Display for EnvAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Parse every token, failing on the first malformed one
pub fn parse_overrides<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<EnvAssignment>, DeployError> {
    tokens
        .iter()
        .map(|t| EnvAssignment::parse(t.as_ref()))
        .collect()
}

/// Apply overrides to every function in `deploy_set`.
///
/// All tokens are validated before any environment is touched, so a
/// malformed token leaves every function unchanged. Later assignments to
/// the same key win.
pub fn apply_overrides<S: AsRef<str>>(
    functions: &mut [Function],
    deploy_set: &DeploySet,
    tokens: &[S],
) -> Result<(), DeployError> {
    let assignments = parse_overrides(tokens)?;

    for &index in deploy_set.indices() {
        if let Some(function) = functions.get_mut(index) {
            for assignment in &assignments {
                function.setenv(&assignment.key, &assignment.value);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::resolve;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn functions(names: &[&str]) -> Vec<Function> {
        names
            .iter()
            .map(|n| {
                let mut f = Function::new(n, "go1.x", PathBuf::from(n));
                f.setenv("EXISTING", "yes");
                f
            })
            .collect()
    }

    // ==================== EnvAssignment::parse tests ====================

    #[test]
    fn test_parse_simple() {
        let a = EnvAssignment::parse("A=1").unwrap();
        assert_eq!(a.key, "A");
        assert_eq!(a.value, "1");
    }

    #[test]
    fn test_parse_splits_on_first_equals() {
        let a = EnvAssignment::parse("B=2=3").unwrap();
        assert_eq!(a.key, "B");
        assert_eq!(a.value, "2=3");
    }

    #[test]
    fn test_parse_empty_value_allowed() {
        let a = EnvAssignment::parse("EMPTY=").unwrap();
        assert_eq!(a.value, "");
    }

    #[test]
    fn test_parse_missing_equals() {
        match EnvAssignment::parse("NOVALUE") {
            Err(DeployError::InvalidEnvironmentAssignment { token }) => {
                assert_eq!(token, "NOVALUE")
            }
            other => panic!("expected InvalidEnvironmentAssignment, got {other:?}"),
        }
    }

    #[test]
    fn test_display() {
        let a = EnvAssignment::parse("URL=http://x?a=b").unwrap();
        assert_eq!(a.to_string(), "URL=http://x?a=b");
    }

    // ==================== apply_overrides tests ====================

    #[test]
    fn test_apply_sets_every_selected_function() {
        let mut fns = functions(&["a", "b", "c"]);
        let set = resolve::<&str>(&fns, &[]).unwrap();

        apply_overrides(&mut fns, &set, &["A=1", "B=2=3"]).unwrap();

        for f in &fns {
            assert_eq!(f.environment["A"], "1");
            assert_eq!(f.environment["B"], "2=3");
            assert_eq!(f.environment["EXISTING"], "yes");
        }
    }

    #[test]
    fn test_apply_only_touches_deploy_set() {
        let mut fns = functions(&["a", "b"]);
        let set = resolve(&fns, &["b"]).unwrap();

        apply_overrides(&mut fns, &set, &["A=1"]).unwrap();

        assert!(!fns[0].environment.contains_key("A"));
        assert_eq!(fns[1].environment["A"], "1");
    }

    #[test]
    fn test_apply_last_write_wins() {
        let mut fns = functions(&["a"]);
        let set = resolve::<&str>(&fns, &[]).unwrap();

        apply_overrides(&mut fns, &set, &["A=1", "A=2"]).unwrap();

        assert_eq!(fns[0].environment["A"], "2");
    }

    #[test]
    fn test_apply_malformed_leaves_environment_unchanged() {
        let mut fns = functions(&["a", "b"]);
        let before: Vec<HashMap<String, String>> =
            fns.iter().map(|f| f.environment.clone()).collect();
        let set = resolve::<&str>(&fns, &[]).unwrap();

        let result = apply_overrides(&mut fns, &set, &["A=1", "NOVALUE"]);

        assert!(matches!(
            result,
            Err(DeployError::InvalidEnvironmentAssignment { .. })
        ));
        let after: Vec<HashMap<String, String>> =
            fns.iter().map(|f| f.environment.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_apply_no_overrides() {
        let mut fns = functions(&["a"]);
        let set = resolve::<&str>(&fns, &[]).unwrap();
        apply_overrides::<&str>(&mut fns, &set, &[]).unwrap();
        assert_eq!(fns[0].environment.len(), 1);
    }
}
