//! Run orchestration
//!
//! Sequences one run: trigger gating, bootstrap config, identity token,
//! mapping document, mapping and role selection, the credential step and
//! finally the published variables. Every error of a run surfaces here and
//! is reported exactly once.

use crate::actions::{IdentityTokenProvider, RunContext, Runner};
use crate::aws::{AssumeRoleParams, CredentialStep, MappingStore};
use crate::config::{BootstrapConfig, ConfigError, Settings};
use crate::mapping::{self, RepositoriesMappings, ResolutionContext};
use crate::PipelineError;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Trigger that is rejected outright
pub const PULL_REQUEST_EVENT: &str = "pull_request";

/// Variable exposing the selected mapping's roles as JSON
pub const AVAILABLE_ROLES_VAR: &str = "AWS_AVAILABLE_ROLES";

/// Output carrying the account id of the assumed role
pub const ACCOUNT_ID_OUTPUT: &str = "aws-account-id";

/// Action inputs
pub const CONFIG_INPUT: &str = "config";
pub const NAME_INPUT: &str = "name";
pub const ACCOUNT_INPUT: &str = "account";
pub const MULTI_ACCOUNT_INPUT: &str = "multi-account";

/// What a successful run selected and published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub mapping: String,
    pub role_arn: String,
    pub account_id: Option<String>,
    pub roles: IndexMap<String, String>,
}

/// Result of a run after error reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Succeeded(RunOutcome),
    Failed(String),
}

impl RunStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Succeeded(_))
    }
}

/// Wires the collaborators of a run together
pub struct Pipeline {
    runner: Arc<dyn Runner>,
    tokens: Arc<dyn IdentityTokenProvider>,
    store: Arc<dyn MappingStore>,
    credentials: Arc<dyn CredentialStep>,
    settings: Settings,
}

impl Pipeline {
    pub fn new(
        runner: Arc<dyn Runner>,
        tokens: Arc<dyn IdentityTokenProvider>,
        store: Arc<dyn MappingStore>,
        credentials: Arc<dyn CredentialStep>,
        settings: Settings,
    ) -> Self {
        Self {
            runner,
            tokens,
            store,
            credentials,
            settings,
        }
    }

    /// Run once, reporting any failure to the runner instead of returning it
    pub async fn run(&self) -> RunStatus {
        match self.run_action().await {
            Ok(outcome) => RunStatus::Succeeded(outcome),
            Err(e) => {
                let message = e.to_string();
                error!(error = ?e, "Run failed: {}", message);
                self.runner.set_failed(&message);
                RunStatus::Failed(message)
            }
        }
    }

    async fn run_action(&self) -> Result<RunOutcome, PipelineError> {
        let context = self.runner.context();
        if context.event_name == PULL_REQUEST_EVENT {
            return Err(PipelineError::UnsupportedEvent(
                "pull requests are not supported (yet)".to_string(),
            ));
        }

        let document = self.fetch_document().await?;
        let resolution = self.resolution_context(&context);
        let (resolved, role_arn) = mapping::resolve_role(&document, &resolution)?;

        info!(
            repository = %resolution.repository,
            git_ref = %resolution.git_ref,
            mapping = %resolved.name,
            role_arn,
            "Selected role"
        );

        let account_id = crate::account_id(role_arn).map(str::to_string);
        if account_id.is_none() {
            warn!(role_arn, "Role ARN has no account id segment");
        }
        let roles = serde_json::to_string(&resolved.roles)?;

        self.credentials
            .assume(AssumeRoleParams {
                region: self.settings.aws.region.clone(),
                mask_account_id: self.settings.aws.mask_account_id,
                role_to_assume: role_arn.to_string(),
                role_duration_seconds: self.settings.aws.role_duration_seconds,
                session_name: self.settings.aws.session_name.clone(),
            })
            .await?;

        self.runner.export_variable(AVAILABLE_ROLES_VAR, &roles)?;
        self.runner
            .set_output(ACCOUNT_ID_OUTPUT, account_id.as_deref().unwrap_or_default())?;

        Ok(RunOutcome {
            mapping: resolved.name.to_string(),
            role_arn: role_arn.to_string(),
            account_id,
            roles: resolved.roles.clone(),
        })
    }

    async fn fetch_document(&self) -> Result<RepositoriesMappings, PipelineError> {
        let input = self.runner.input(CONFIG_INPUT).ok_or_else(|| {
            ConfigError::Invalid(format!("Input required and not supplied: {}", CONFIG_INPUT))
        })?;
        let location = BootstrapConfig::parse(&input)?;

        let token = self.tokens.id_token(&self.settings.aws.audience).await?;
        let raw = self.store.fetch(&location, &token).await?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Resolution inputs of this run
    pub fn resolution_context(&self, context: &RunContext) -> ResolutionContext {
        ResolutionContext {
            repository: context.repo().to_string(),
            git_ref: context.git_ref.clone(),
            mapping_name: self.runner.input(NAME_INPUT),
            account: self.runner.input(ACCOUNT_INPUT),
            multi_account: self.runner.bool_input(MULTI_ACCOUNT_INPUT),
        }
    }

    /// Clear everything a run published. Safe to call repeatedly.
    pub fn cleanup(&self) -> Result<(), PipelineError> {
        self.runner.export_variable(AVAILABLE_ROLES_VAR, "")?;
        self.credentials.cleanup()?;
        Ok(())
    }
}
