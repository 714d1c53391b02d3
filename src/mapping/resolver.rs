//! Mapping selection for a repository and ref

use super::{MappingError, RefMatcher, RepositoriesMappings, RepositoryMappings, ResolvedMapping};
use tracing::debug;

/// Selects a single mapping out of a repository's mapping table
pub struct MappingResolver<'a> {
    mappings: &'a RepositoryMappings,
}

impl<'a> MappingResolver<'a> {
    /// Create a resolver over one repository's mappings
    pub fn new(mappings: &'a RepositoryMappings) -> Self {
        Self { mappings }
    }

    /// Create a resolver for a repository of the full document. Fails when
    /// the repository is absent or maps to an empty table.
    pub fn for_repository(
        all: &'a RepositoriesMappings,
        repository: &str,
    ) -> Result<Self, MappingError> {
        match all.get(repository) {
            Some(mappings) if !mappings.is_empty() => Ok(Self::new(mappings)),
            _ => Err(MappingError::RepositoryUnmapped {
                repository: repository.to_string(),
            }),
        }
    }

    /// Mappings with at least one ref pattern matching `git_ref`, in
    /// document order
    pub fn candidates(&self, git_ref: &str) -> Vec<ResolvedMapping<'a>> {
        self.mappings
            .iter()
            .filter(|(_, mapping)| RefMatcher::new(&mapping.refs).matches_any(git_ref))
            .map(|(name, mapping)| ResolvedMapping { name, mapping })
            .collect()
    }

    /// Pick the mapping for `git_ref`.
    ///
    /// Without a requested name exactly one mapping must match the ref. A
    /// requested name is looked up in the whole table, regardless of refs.
    pub fn resolve(
        &self,
        git_ref: &str,
        requested_name: Option<&str>,
    ) -> Result<ResolvedMapping<'a>, MappingError> {
        if let Some(name) = requested_name {
            return match self.mappings.get_key_value(name) {
                Some((name, mapping)) => {
                    debug!(mapping = %name, "Using explicitly requested mapping");
                    Ok(ResolvedMapping { name, mapping })
                }
                None => Err(MappingError::MappingNotFound {
                    name: name.to_string(),
                    available: self.names(),
                }),
            };
        }

        let mut candidates = self.candidates(git_ref);
        if candidates.len() != 1 {
            return Err(MappingError::AmbiguousMapping {
                git_ref: git_ref.to_string(),
                matched: candidates.iter().map(|c| c.name.to_string()).collect(),
                available: self.names(),
            });
        }

        let resolved = candidates.remove(0);
        debug!(mapping = %resolved.name, git_ref, "Mapping matched ref");
        Ok(resolved)
    }

    /// All mapping names in document order
    pub fn names(&self) -> Vec<String> {
        self.mappings.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::RepositoryMapping;

    fn mappings() -> RepositoryMappings {
        let mut m = RepositoryMappings::new();
        m.insert(
            "main".to_string(),
            RepositoryMapping::new(["refs/heads/main"], [("prod", "prod-role")]),
        );
        m.insert(
            "features".to_string(),
            RepositoryMapping::new(["refs/heads/feature/*", "refs/heads/fix/*"], [("dev", "dev-role")]),
        );
        m.insert(
            "everything".to_string(),
            RepositoryMapping::new(["refs/tags/*", "refs/heads/fix/*"], [("dev", "dev-role")]),
        );
        m
    }

    #[test]
    fn test_single_candidate() {
        let m = mappings();
        let resolver = MappingResolver::new(&m);
        let resolved = resolver.resolve("refs/heads/feature/login", None).unwrap();
        assert_eq!(resolved.name, "features");
        assert_eq!(resolved.roles["dev"], "dev-role");
    }

    #[test]
    fn test_multiple_candidates_are_ambiguous() {
        let m = mappings();
        let err = MappingResolver::new(&m)
            .resolve("refs/heads/fix/crash", None)
            .unwrap_err();
        match err {
            MappingError::AmbiguousMapping { matched, .. } => {
                assert_eq!(matched, vec!["features", "everything"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_no_candidate_is_ambiguous() {
        let m = mappings();
        let err = MappingResolver::new(&m)
            .resolve("refs/heads/dev", None)
            .unwrap_err();
        match err {
            MappingError::AmbiguousMapping {
                matched, available, ..
            } => {
                assert!(matched.is_empty());
                assert_eq!(available, vec!["main", "features", "everything"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_requested_name_bypasses_refs() {
        let m = mappings();
        let resolved = MappingResolver::new(&m)
            .resolve("refs/heads/dev", Some("main"))
            .unwrap();
        assert_eq!(resolved.name, "main");

        // also disambiguates several matches
        let resolved = MappingResolver::new(&m)
            .resolve("refs/heads/fix/crash", Some("everything"))
            .unwrap();
        assert_eq!(resolved.name, "everything");
    }

    #[test]
    fn test_unknown_requested_name() {
        let m = mappings();
        let err = MappingResolver::new(&m)
            .resolve("refs/heads/main", Some("mapping2"))
            .unwrap_err();
        assert!(matches!(err, MappingError::MappingNotFound { ref name, .. } if name == "mapping2"));
        assert!(err.to_string().starts_with("Mapping with name 'mapping2' not found"));
    }

    #[test]
    fn test_repository_lookup() {
        let mut all = RepositoriesMappings::new();
        all.insert("repo".to_string(), RepositoryMappings::new());
        all.insert("mapped".to_string(), mappings());

        assert!(matches!(
            MappingResolver::for_repository(&all, "repo"),
            Err(MappingError::RepositoryUnmapped { .. })
        ));
        assert!(matches!(
            MappingResolver::for_repository(&all, "other"),
            Err(MappingError::RepositoryUnmapped { .. })
        ));
        assert!(MappingResolver::for_repository(&all, "mapped").is_ok());
    }
}
