//! Mapping resolution and role selection
//!
//! Handles:
//! - Ref pattern matching against mapping rules
//! - Selecting exactly one mapping for a repository and ref
//! - Choosing the role ARN under single, named or cross-account policies
//! - Linting mapping documents

mod lint;
mod matcher;
mod resolver;
mod selector;
mod types;

pub use lint::{lint, MappingIssue, Problem};
pub use matcher::RefMatcher;
pub use resolver::MappingResolver;
pub use selector::RoleSelector;
pub use types::*;

use thiserror::Error;

/// Mapping and role selection errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("repository {repository} is not mapped to any AWS account")]
    RepositoryUnmapped { repository: String },

    #[error("{}", ambiguous_mapping(.git_ref, .matched, .available))]
    AmbiguousMapping {
        git_ref: String,
        matched: Vec<String>,
        available: Vec<String>,
    },

    #[error("Mapping with name '{name}' not found. Available mappings are: [{}]", .available.join(", "))]
    MappingNotFound { name: String, available: Vec<String> },

    #[error("Both account and multi-account attributes are specified. Please only set one.")]
    ConflictingSelectors,

    #[error(
        "The mapping '{mapping}' contains multiple accounts, but account parameter was not set. \
         Please specify the account. Available accounts are: [{}]",
        .accounts.join(", ")
    )]
    AmbiguousAccount {
        mapping: String,
        accounts: Vec<String>,
    },

    #[error("The mapping '{mapping}' is not a multi-account mapping, but multi-account was requested")]
    NotMultiAccountMapping { mapping: String },

    #[error(
        "The mapping {mapping} does not have account '{account}' assigned. \
         Please specify correct account. Available accounts are: [{}]",
        .accounts.join(", ")
    )]
    UnknownAccount {
        mapping: String,
        account: String,
        accounts: Vec<String>,
    },
}

fn ambiguous_mapping(git_ref: &str, matched: &[String], available: &[String]) -> String {
    if matched.is_empty() {
        format!(
            "No mapping found for this repo matching to ref {git_ref}, \
             please specify 'name' parameter. Available mappings are: [{}]",
            available.join(", ")
        )
    } else {
        format!(
            "More than 1 mapping found for this repo matching to ref {git_ref}, \
             please specify 'name' parameter. Available mappings are: [{}]",
            matched.join(", ")
        )
    }
}

/// Resolve the role ARN for a repository in one pass: look up the
/// repository table, pick the mapping, then the role.
pub fn resolve_role<'a>(
    mappings: &'a RepositoriesMappings,
    context: &ResolutionContext,
) -> Result<(ResolvedMapping<'a>, &'a str), MappingError> {
    let resolver = MappingResolver::for_repository(mappings, &context.repository)?;
    let mapping = resolver.resolve(&context.git_ref, context.mapping_name.as_deref())?;
    let role_arn = RoleSelector::from_context(context).select(&mapping)?;
    Ok((mapping, role_arn))
}
