//! Mapping document data structures

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Every mapped repository, keyed by repository name
pub type RepositoriesMappings = IndexMap<String, RepositoryMappings>;

/// Named mappings of a single repository
pub type RepositoryMappings = IndexMap<String, RepositoryMapping>;

/// A rule tying ref patterns of a repository to assumable roles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryMapping {
    /// Glob patterns matched against the triggering ref
    #[serde(default)]
    pub refs: Vec<String>,
    /// Account label to role ARN
    #[serde(default)]
    pub roles: IndexMap<String, String>,
    /// Role granting access across several accounts at once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_account_role: Option<String>,
}

impl RepositoryMapping {
    /// Create a mapping for the given refs and roles
    pub fn new<R, A, N>(refs: R, roles: A) -> Self
    where
        R: IntoIterator<Item = N>,
        A: IntoIterator<Item = (N, N)>,
        N: Into<String>,
    {
        Self {
            refs: refs.into_iter().map(Into::into).collect(),
            roles: roles
                .into_iter()
                .map(|(account, arn)| (account.into(), arn.into()))
                .collect(),
            cross_account_role: None,
        }
    }

    /// Attach a cross-account role
    pub fn with_cross_account_role(mut self, arn: impl Into<String>) -> Self {
        self.cross_account_role = Some(arn.into());
        self
    }

    /// Account labels in document order
    pub fn accounts(&self) -> Vec<&str> {
        self.roles.keys().map(String::as_str).collect()
    }
}

/// A mapping together with the name it was found under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedMapping<'a> {
    pub name: &'a str,
    pub mapping: &'a RepositoryMapping,
}

impl Deref for ResolvedMapping<'_> {
    type Target = RepositoryMapping;

    fn deref(&self) -> &Self::Target {
        self.mapping
    }
}

/// Inputs of a single resolution pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionContext {
    /// Repository name without the owner prefix
    pub repository: String,
    /// Ref that triggered the run, e.g. `refs/heads/main`
    pub git_ref: String,
    /// Explicit mapping name, bypasses ref filtering
    pub mapping_name: Option<String>,
    /// Named account to pick from the mapping's roles
    pub account: Option<String>,
    /// Use the mapping's cross-account role
    pub multi_account: bool,
}

impl ResolutionContext {
    pub fn new(repository: impl Into<String>, git_ref: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            git_ref: git_ref.into(),
            ..Default::default()
        }
    }

    pub fn with_mapping_name(mut self, name: impl Into<String>) -> Self {
        self.mapping_name = Some(name.into());
        self
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn with_multi_account(mut self, multi_account: bool) -> Self {
        self.multi_account = multi_account;
        self
    }
}
