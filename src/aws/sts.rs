//! STS AssumeRoleWithWebIdentity

use super::StsError;
use aws_sdk_sts::config::{BehaviorVersion, Region};
use aws_sdk_sts::error::DisplayErrorContext;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::time::SystemTime;
use tracing::debug;

const OPERATION: &str = "AssumeRoleWithWebIdentity";

/// Temporary credentials returned by STS
#[derive(Debug, Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    pub session_token: SecretString,
    pub expiration: Option<DateTime<Utc>>,
}

impl AwsCredentials {
    pub fn expires_at(&self) -> Option<SystemTime> {
        self.expiration.map(SystemTime::from)
    }
}

/// Role to assume with a web identity token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebIdentityRequest {
    pub role_arn: String,
    pub session_name: String,
    pub duration_seconds: Option<u32>,
}

/// Unauthenticated STS client, web identity calls need no AWS credentials
#[derive(Debug, Clone)]
pub struct StsClient {
    client: aws_sdk_sts::Client,
}

impl StsClient {
    pub fn new(region: &str) -> Self {
        let config = aws_sdk_sts::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .build();
        Self {
            client: aws_sdk_sts::Client::from_conf(config),
        }
    }

    /// Exchange a web identity token for role credentials
    pub async fn assume_role_with_web_identity(
        &self,
        request: &WebIdentityRequest,
        web_identity_token: &SecretString,
    ) -> Result<AwsCredentials, StsError> {
        debug!(
            role_arn = %request.role_arn,
            session_name = %request.session_name,
            "Assuming role with web identity"
        );

        let resp = self
            .client
            .assume_role_with_web_identity()
            .role_arn(&request.role_arn)
            .role_session_name(&request.session_name)
            .web_identity_token(web_identity_token.expose_secret())
            .set_duration_seconds(request.duration_seconds.map(|d| d as i32))
            .send()
            .await
            .map_err(|e| StsError::Service {
                operation: OPERATION,
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let creds = resp.credentials().ok_or(StsError::MissingCredentials {
            operation: OPERATION,
        })?;

        let expiration = creds.expiration();
        let expiration = DateTime::from_timestamp(expiration.secs(), expiration.subsec_nanos());

        debug!(
            role_arn = %request.role_arn,
            access_key_id = creds.access_key_id(),
            expiration = ?expiration,
            "Role assumed"
        );

        Ok(AwsCredentials {
            access_key_id: creds.access_key_id().to_owned(),
            secret_access_key: SecretString::from(creds.secret_access_key().to_owned()),
            session_token: SecretString::from(creds.session_token().to_owned()),
            expiration,
        })
    }
}
