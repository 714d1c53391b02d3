//! Structural checks for mapping documents

use super::matcher;
use super::RepositoriesMappings;
use std::fmt;

/// What is wrong with a mapping entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    /// Repository maps to an empty table and can never resolve
    EmptyRepository,
    /// Mapping has no ref patterns
    NoRefs,
    /// Mapping has no roles
    NoRoles,
    /// Ref pattern does not compile and never matches
    InvalidPattern { pattern: String, reason: String },
    /// Role ARN lacks the account id segment
    MalformedArn { account: String, arn: String },
}

/// A problem found while linting, located by repository and mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingIssue {
    pub repository: String,
    pub mapping: Option<String>,
    pub problem: Problem,
}

impl fmt::Display for MappingIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.mapping {
            Some(mapping) => write!(f, "{}/{}: ", self.repository, mapping)?,
            None => write!(f, "{}: ", self.repository)?,
        }
        match &self.problem {
            Problem::EmptyRepository => write!(f, "repository has no mappings"),
            Problem::NoRefs => write!(f, "mapping has no refs"),
            Problem::NoRoles => write!(f, "mapping has no roles"),
            Problem::InvalidPattern { pattern, reason } => {
                write!(f, "ref pattern '{}' is invalid: {}", pattern, reason)
            }
            Problem::MalformedArn { account, arn } => {
                write!(f, "role '{}' for account '{}' has no account id", arn, account)
            }
        }
    }
}

/// Check every repository and mapping of a document
pub fn lint(document: &RepositoriesMappings) -> Vec<MappingIssue> {
    let mut issues = Vec::new();

    for (repository, mappings) in document {
        if mappings.is_empty() {
            issues.push(MappingIssue {
                repository: repository.clone(),
                mapping: None,
                problem: Problem::EmptyRepository,
            });
            continue;
        }

        for (name, mapping) in mappings {
            let mut report = |problem| {
                issues.push(MappingIssue {
                    repository: repository.clone(),
                    mapping: Some(name.clone()),
                    problem,
                })
            };

            if mapping.refs.is_empty() {
                report(Problem::NoRefs);
            }
            if mapping.roles.is_empty() {
                report(Problem::NoRoles);
            }
            for pattern in &mapping.refs {
                if let Err(e) = matcher::compile(pattern) {
                    report(Problem::InvalidPattern {
                        pattern: pattern.clone(),
                        reason: e.msg.to_string(),
                    });
                }
            }
            let arns = mapping
                .roles
                .iter()
                .map(|(account, arn)| (account.as_str(), arn.as_str()))
                .chain(
                    mapping
                        .cross_account_role
                        .as_deref()
                        .map(|arn| ("crossAccountRole", arn)),
                );
            for (account, arn) in arns {
                if crate::account_id(arn).is_none() {
                    report(Problem::MalformedArn {
                        account: account.to_string(),
                        arn: arn.to_string(),
                    });
                }
            }
        }
    }

    issues
}
