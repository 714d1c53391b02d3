//! Role ARN selection from a resolved mapping

use super::{MappingError, ResolutionContext, ResolvedMapping};

/// Account selection policy for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleSelector<'a> {
    /// Named account to pick
    pub account: Option<&'a str>,
    /// Use the cross-account role
    pub multi_account: bool,
}

impl<'a> RoleSelector<'a> {
    pub fn new(account: Option<&'a str>, multi_account: bool) -> Self {
        Self {
            account,
            multi_account,
        }
    }

    pub fn from_context(context: &'a ResolutionContext) -> Self {
        Self::new(context.account.as_deref(), context.multi_account)
    }

    /// Pick the role ARN of `mapping` under this policy
    pub fn select<'m>(&self, mapping: &ResolvedMapping<'m>) -> Result<&'m str, MappingError> {
        let mapping = *mapping;
        match (self.account, self.multi_account) {
            (Some(_), true) => Err(MappingError::ConflictingSelectors),

            (None, false) => {
                if mapping.mapping.roles.len() != 1 {
                    return Err(MappingError::AmbiguousAccount {
                        mapping: mapping.name.to_string(),
                        accounts: account_labels(&mapping),
                    });
                }
                Ok(mapping.mapping.roles[0].as_str())
            }

            (None, true) => mapping
                .mapping
                .cross_account_role
                .as_deref()
                .ok_or_else(|| MappingError::NotMultiAccountMapping {
                    mapping: mapping.name.to_string(),
                }),

            (Some(account), false) => mapping
                .mapping
                .roles
                .get(account)
                .map(String::as_str)
                .ok_or_else(|| MappingError::UnknownAccount {
                    mapping: mapping.name.to_string(),
                    account: account.to_string(),
                    accounts: account_labels(&mapping),
                }),
        }
    }
}

fn account_labels(mapping: &ResolvedMapping<'_>) -> Vec<String> {
    mapping.roles.keys().cloned().collect()
}
