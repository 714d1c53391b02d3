//! AWS collaborators
//!
//! - [`MappingStore`]: fetches the raw mapping document
//! - [`CredentialStep`]: assumes the selected role and exports credentials
//! - STS web identity exchange shared by both, retried with backoff

mod local;
mod s3;
mod step;
mod sts;

pub use local::LocalMappingStore;
pub use s3::S3MappingStore;
pub use step::{export_credentials, DryRunCredentialStep, StsCredentialStep, CREDENTIAL_VARIABLES};
pub use sts::{AwsCredentials, StsClient, WebIdentityRequest};

use crate::actions::{RunnerError, TokenError};
use crate::config::BootstrapConfig;
use crate::retry::RetryExhausted;
use async_trait::async_trait;
use secrecy::SecretString;
use std::path::PathBuf;
use thiserror::Error;

/// STS call errors
#[derive(Error, Debug)]
pub enum StsError {
    #[error("AWS STS returned error for {operation}: {message}")]
    Service {
        operation: &'static str,
        message: String,
    },

    #[error("AWS STS {operation} returned empty credentials")]
    MissingCredentials { operation: &'static str },
}

/// Mapping document retrieval errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to obtain credentials for the mapping document: {0}")]
    TokenRefreshExhausted(#[from] RetryExhausted<StsError>),

    #[error("Failed to fetch s3://{bucket}/{key}: {message}")]
    Fetch {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("Failed to read mapping file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Credential step errors
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Could not assume role: {0}")]
    Assume(#[from] RetryExhausted<StsError>),

    #[error(transparent)]
    Runner(#[from] RunnerError),
}

/// Source of the raw mapping document
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Fetch the document described by `location`, authenticating with the
    /// run's identity token
    async fn fetch(
        &self,
        location: &BootstrapConfig,
        web_identity_token: &SecretString,
    ) -> Result<Vec<u8>, StoreError>;
}

/// Parameters handed to the credential step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeRoleParams {
    pub region: String,
    pub mask_account_id: bool,
    pub role_to_assume: String,
    pub role_duration_seconds: u32,
    pub session_name: String,
}

/// Performs the actual role assumption for later steps of the run
#[async_trait]
pub trait CredentialStep: Send + Sync {
    async fn assume(&self, params: AssumeRoleParams) -> Result<(), ExchangeError>;

    /// Undo whatever `assume` exported. Must be idempotent.
    fn cleanup(&self) -> Result<(), ExchangeError>;
}
