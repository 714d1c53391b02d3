//! Credential assumption for later steps of the run

use super::{
    AssumeRoleParams, AwsCredentials, CredentialStep, ExchangeError, StsClient, WebIdentityRequest,
};
use crate::actions::{IdentityTokenProvider, Runner, RunnerError};
use crate::config::DEFAULT_AUDIENCE;
use crate::retry::RetryingRefresher;
use async_trait::async_trait;
use parking_lot::Mutex;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::info;

/// Variables exported by a successful assumption
pub const CREDENTIAL_VARIABLES: [&str; 5] = [
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SESSION_TOKEN",
    "AWS_REGION",
    "AWS_DEFAULT_REGION",
];

/// Export role credentials to later steps, masking secrets first
pub fn export_credentials(
    runner: &dyn Runner,
    creds: &AwsCredentials,
    params: &AssumeRoleParams,
) -> Result<(), RunnerError> {
    let secret_access_key = creds.secret_access_key.expose_secret();
    let session_token = creds.session_token.expose_secret();

    runner.add_mask(&creds.access_key_id);
    runner.add_mask(secret_access_key);
    runner.add_mask(session_token);
    if params.mask_account_id {
        if let Some(account_id) = crate::account_id(&params.role_to_assume) {
            runner.add_mask(account_id);
        }
    }

    let values = [
        creds.access_key_id.as_str(),
        secret_access_key,
        session_token,
        params.region.as_str(),
        params.region.as_str(),
    ];
    for (name, value) in CREDENTIAL_VARIABLES.iter().zip(values) {
        runner.export_variable(name, value)?;
    }
    Ok(())
}

/// Assumes the role through STS with a fresh identity token
pub struct StsCredentialStep {
    runner: Arc<dyn Runner>,
    tokens: Arc<dyn IdentityTokenProvider>,
    refresher: RetryingRefresher,
    audience: String,
}

impl StsCredentialStep {
    pub fn new(
        runner: Arc<dyn Runner>,
        tokens: Arc<dyn IdentityTokenProvider>,
        refresher: RetryingRefresher,
    ) -> Self {
        Self {
            runner,
            tokens,
            refresher,
            audience: DEFAULT_AUDIENCE.to_string(),
        }
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }
}

#[async_trait]
impl CredentialStep for StsCredentialStep {
    async fn assume(&self, params: AssumeRoleParams) -> Result<(), ExchangeError> {
        let token = self.tokens.id_token(&self.audience).await?;
        let sts = StsClient::new(&params.region);
        let request = WebIdentityRequest {
            role_arn: params.role_to_assume.clone(),
            session_name: params.session_name.clone(),
            duration_seconds: Some(params.role_duration_seconds),
        };

        let creds = self
            .refresher
            .refresh(|| sts.assume_role_with_web_identity(&request, &token))
            .await?;

        export_credentials(self.runner.as_ref(), &creds, &params)?;
        info!(role_arn = %params.role_to_assume, region = %params.region, "Role credentials exported");
        Ok(())
    }

    fn cleanup(&self) -> Result<(), ExchangeError> {
        for name in CREDENTIAL_VARIABLES {
            self.runner.export_variable(name, "")?;
        }
        Ok(())
    }
}

/// Records the parameters instead of assuming anything
#[derive(Debug, Default)]
pub struct DryRunCredentialStep {
    assumed: Mutex<Vec<AssumeRoleParams>>,
}

impl DryRunCredentialStep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters of every `assume` call so far
    pub fn assumed(&self) -> Vec<AssumeRoleParams> {
        self.assumed.lock().clone()
    }
}

#[async_trait]
impl CredentialStep for DryRunCredentialStep {
    async fn assume(&self, params: AssumeRoleParams) -> Result<(), ExchangeError> {
        info!(role_arn = %params.role_to_assume, region = %params.region, "Dry run, not assuming role");
        self.assumed.lock().push(params);
        Ok(())
    }

    fn cleanup(&self) -> Result<(), ExchangeError> {
        self.assumed.lock().clear();
        Ok(())
    }
}
