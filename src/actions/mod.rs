//! CI runner integration
//!
//! Everything that reads from or writes to the surrounding GitHub Actions
//! run goes through the [`Runner`] trait: inputs, trigger context, exported
//! variables, outputs, masks and the failure report. The rest of the crate
//! never touches process-wide state.

mod command;
mod env;
mod github;
mod oidc;
mod recording;

pub use command::{escape_data, escape_property, Command};
pub use env::Env;
pub use github::GitHubRunner;
pub use oidc::{GitHubOidc, IdentityTokenProvider, StaticToken, TokenError};
pub use recording::RecordingRunner;

use thiserror::Error;

/// Runner-related errors
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to write file command {path}: {source}")]
    FileCommand {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write workflow command: {0}")]
    Stdout(#[from] std::io::Error),

    #[error("Unexpected input: '{name}' should not contain the delimiter '{delimiter}'")]
    Delimiter { name: String, delimiter: String },
}

/// Trigger context of the current run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunContext {
    /// Event that triggered the run, e.g. `push`
    pub event_name: String,
    /// `owner/repo`
    pub repository: String,
    /// Triggering ref, e.g. `refs/heads/main`
    pub git_ref: String,
}

impl RunContext {
    /// Repository name without the owner
    pub fn repo(&self) -> &str {
        self.repository
            .rsplit_once('/')
            .map(|(_, repo)| repo)
            .unwrap_or(&self.repository)
    }
}

/// Narrow adapter over the CI runner
pub trait Runner: Send + Sync {
    /// Trigger context of the run
    fn context(&self) -> RunContext;

    /// Value of an action input, `None` when unset or blank
    fn input(&self, name: &str) -> Option<String>;

    /// Boolean input, only `"true"` counts as set
    fn bool_input(&self, name: &str) -> bool {
        self.input(name).as_deref() == Some("true")
    }

    /// Export an environment variable to later steps
    fn export_variable(&self, name: &str, value: &str) -> Result<(), RunnerError>;

    /// Publish a step output
    fn set_output(&self, name: &str, value: &str) -> Result<(), RunnerError>;

    /// Hide a value from the run's logs
    fn add_mask(&self, value: &str);

    /// Report the run as failed
    fn set_failed(&self, message: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_strips_owner() {
        let ctx = RunContext {
            repository: "octo-org/test-repo".to_string(),
            ..Default::default()
        };
        assert_eq!(ctx.repo(), "test-repo");

        let ctx = RunContext {
            repository: "test-repo".to_string(),
            ..Default::default()
        };
        assert_eq!(ctx.repo(), "test-repo");
    }
}
