//! Ref pattern matching for mapping selection

use glob::{MatchOptions, Pattern, PatternError};

/// Separators carry no meaning in refs, a single `*` spans `/`
const REF_MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Glob matcher over the ref patterns of one mapping
#[derive(Debug, Clone, Default)]
pub struct RefMatcher {
    patterns: Vec<Pattern>,
}

impl RefMatcher {
    /// Build a matcher, silently dropping patterns that do not compile
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .filter_map(|p| compile(p.as_ref()).ok())
                .collect(),
        }
    }

    /// Whether any pattern matches the whole ref
    pub fn matches_any(&self, git_ref: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_with(git_ref, REF_MATCH_OPTIONS))
    }

    /// Test a single pattern against a ref. Never fails: an invalid pattern
    /// matches nothing.
    pub fn matches(pattern: &str, git_ref: &str) -> bool {
        compile(pattern)
            .map(|p| p.matches_with(git_ref, REF_MATCH_OPTIONS))
            .unwrap_or(false)
    }
}

/// Compile a ref pattern. `**` is folded into `*` since both span separators
/// here, and the glob crate only accepts `**` as a whole path component.
pub fn compile(pattern: &str) -> Result<Pattern, PatternError> {
    let mut folded = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if c == '*' && folded.ends_with('*') {
            continue;
        }
        folded.push(c);
    }
    Pattern::new(&folded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_matches_everything() {
        for r in ["refs/heads/main", "refs/tags/v1.0.0", "a/b/c/d"] {
            assert!(RefMatcher::matches("*", r), "{r}");
        }
    }

    #[test]
    fn test_exact_ref() {
        assert!(RefMatcher::matches("refs/heads/main", "refs/heads/main"));
        assert!(!RefMatcher::matches("refs/heads/main", "refs/heads/dev"));
        assert!(!RefMatcher::matches("refs/heads/main", "refs/heads/main2"));
    }

    #[test]
    fn test_star_crosses_separators() {
        assert!(RefMatcher::matches("refs/heads/*", "refs/heads/dev"));
        assert!(RefMatcher::matches("refs/heads/*", "refs/heads/feature/x"));
        assert!(RefMatcher::matches("refs/*/main", "refs/heads/main"));
        assert!(!RefMatcher::matches("refs/heads/*", "refs/tags/v1"));
    }

    #[test]
    fn test_double_star() {
        assert!(RefMatcher::matches("refs/**", "refs/heads/feature/x"));
        assert!(RefMatcher::matches("refs/heads/release-**", "refs/heads/release-1/hotfix"));
    }

    #[test]
    fn test_question_mark_and_classes() {
        assert!(RefMatcher::matches("refs/tags/v?", "refs/tags/v1"));
        assert!(!RefMatcher::matches("refs/tags/v?", "refs/tags/v10"));
        assert!(RefMatcher::matches("refs/tags/v[0-9].*", "refs/tags/v2.1"));
        assert!(!RefMatcher::matches("refs/tags/v[0-9].*", "refs/tags/vx.1"));
        assert!(RefMatcher::matches("refs/heads/[!m]*", "refs/heads/dev"));
        assert!(!RefMatcher::matches("refs/heads/[!m]*", "refs/heads/main"));
    }

    #[test]
    fn test_invalid_pattern_never_matches() {
        assert!(!RefMatcher::matches("refs/heads/[main", "refs/heads/[main"));
        assert!(!RefMatcher::matches("refs/heads/[main", "refs/heads/m"));
    }

    #[test]
    fn test_matches_any() {
        let matcher = RefMatcher::new(["refs/heads/main", "refs/tags/*", "[broken"]);
        assert!(matcher.matches_any("refs/heads/main"));
        assert!(matcher.matches_any("refs/tags/v1"));
        assert!(!matcher.matches_any("refs/heads/dev"));
        assert!(!RefMatcher::new(Vec::<String>::new()).matches_any("refs/heads/main"));
    }
}
