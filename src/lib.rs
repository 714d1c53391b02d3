//! pipeline-roles - AWS role selection for CI pipelines
//!
//! Resolves which IAM role a pipeline run assumes. A mapping document in S3
//! ties repositories and ref patterns to role ARNs; the run's repository and
//! ref pick one mapping, the account selectors pick one role, and the
//! credential step assumes it for the rest of the run.

pub mod actions;
pub mod aws;
pub mod config;
pub mod mapping;
pub mod pipeline;
pub mod retry;

use thiserror::Error;

/// Core error types for pipeline-roles
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    UnsupportedEvent(String),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Mapping(#[from] mapping::MappingError),

    #[error("Malformed mapping document: {0}")]
    MalformedDocument(#[from] serde_json::Error),

    #[error(transparent)]
    Token(#[from] actions::TokenError),

    #[error(transparent)]
    Store(#[from] aws::StoreError),

    #[error(transparent)]
    Exchange(#[from] aws::ExchangeError),

    #[error("Runner error: {0}")]
    Runner(#[from] actions::RunnerError),
}

/// Account id of a role ARN, its fifth `:`-separated segment
pub fn account_id(role_arn: &str) -> Option<&str> {
    role_arn.split(':').nth(4).filter(|id| !id.is_empty())
}
