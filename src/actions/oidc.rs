//! Identity token acquisition from the GitHub OIDC provider

use super::Env;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

const REQUEST_URL_VAR: &str = "ACTIONS_ID_TOKEN_REQUEST_URL";
const REQUEST_TOKEN_VAR: &str = "ACTIONS_ID_TOKEN_REQUEST_TOKEN";

/// Identity token errors
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Unable to get {0} env variable, is the workflow missing the `id-token: write` permission?")]
    MissingVariable(&'static str),

    #[error("Failed to get ID token: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to get ID token: provider responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response json body does not have ID token field")]
    MissingToken,
}

/// Source of bearer tokens for a given audience
#[async_trait]
pub trait IdentityTokenProvider: Send + Sync {
    async fn id_token(&self, audience: &str) -> Result<SecretString, TokenError>;
}

#[derive(Deserialize)]
struct TokenResponse {
    value: Option<String>,
}

/// GitHub Actions OIDC token provider
pub struct GitHubOidc {
    env: Env,
    client: Client,
}

impl GitHubOidc {
    pub fn new(env: Env) -> Self {
        Self {
            env,
            client: Client::new(),
        }
    }

    fn variable(&self, name: &'static str) -> Result<String, TokenError> {
        self.env
            .get(name)
            .filter(|v| !v.is_empty())
            .ok_or(TokenError::MissingVariable(name))
    }
}

#[async_trait]
impl IdentityTokenProvider for GitHubOidc {
    async fn id_token(&self, audience: &str) -> Result<SecretString, TokenError> {
        let url = self.variable(REQUEST_URL_VAR)?;
        let request_token = self.variable(REQUEST_TOKEN_VAR)?;

        debug!(audience, "Requesting ID token");
        let response = self
            .client
            .get(&url)
            .query(&[("audience", audience)])
            .bearer_auth(request_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TokenError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body: TokenResponse = response.json().await?;
        body.value
            .filter(|v| !v.is_empty())
            .map(SecretString::from)
            .ok_or(TokenError::MissingToken)
    }
}

/// Hands out a fixed token, for offline runs
pub struct StaticToken(SecretString);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }
}

#[async_trait]
impl IdentityTokenProvider for StaticToken {
    async fn id_token(&self, _audience: &str) -> Result<SecretString, TokenError> {
        Ok(self.0.clone())
    }
}
