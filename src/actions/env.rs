//! Read-only view of the process environment

use std::collections::HashMap;
use std::sync::Arc;

/// Environment variable source.
///
/// `Env::real()` reads the process environment; `Env::from_slice` serves a
/// fixed set of variables so tests never touch process-wide state.
#[derive(Debug, Clone)]
pub struct Env(Inner);

#[derive(Debug, Clone)]
enum Inner {
    Real,
    Fake(Arc<HashMap<String, String>>),
}

impl Env {
    pub fn real() -> Self {
        Self(Inner::Real)
    }

    pub fn from_slice(vars: &[(&str, &str)]) -> Self {
        Self(Inner::Fake(Arc::new(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )))
    }

    /// Value of `key`, `None` when unset or not valid unicode
    pub fn get(&self, key: &str) -> Option<String> {
        match &self.0 {
            Inner::Real => std::env::var(key).ok(),
            Inner::Fake(vars) => vars.get(key).cloned(),
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::real()
    }
}

impl From<HashMap<String, String>> for Env {
    fn from(vars: HashMap<String, String>) -> Self {
        Self(Inner::Fake(Arc::new(vars)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_env() {
        let env = Env::from_slice(&[("GITHUB_REF", "refs/heads/main")]);
        assert_eq!(env.get("GITHUB_REF").as_deref(), Some("refs/heads/main"));
        assert_eq!(env.get("GITHUB_SHA"), None);
    }
}
