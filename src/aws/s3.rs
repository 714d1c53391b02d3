//! Mapping document stored in S3

use super::{AwsCredentials, MappingStore, StoreError, StsClient, WebIdentityRequest};
use crate::config::{AwsSettings, BootstrapConfig};
use crate::retry::RetryingRefresher;
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

const PROVIDER_NAME: &str = "pipeline-roles-bootstrap";

/// Reads the mapping document from S3 using the bootstrap role
pub struct S3MappingStore {
    sts: StsClient,
    refresher: RetryingRefresher,
    region: String,
    session_name: String,
}

impl S3MappingStore {
    pub fn new(settings: &AwsSettings, refresher: RetryingRefresher) -> Self {
        Self {
            sts: StsClient::new(&settings.region),
            refresher,
            region: settings
                .mapping_region
                .clone()
                .unwrap_or_else(|| settings.region.clone()),
            session_name: settings.bootstrap_session_name.clone(),
        }
    }

    fn client(&self, creds: &AwsCredentials) -> aws_sdk_s3::Client {
        let credentials = Credentials::new(
            creds.access_key_id.clone(),
            creds.secret_access_key.expose_secret().to_owned(),
            Some(creds.session_token.expose_secret().to_owned()),
            creds.expires_at(),
            PROVIDER_NAME,
        );
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .credentials_provider(credentials)
            .build();
        aws_sdk_s3::Client::from_conf(config)
    }
}

#[async_trait]
impl MappingStore for S3MappingStore {
    async fn fetch(
        &self,
        location: &BootstrapConfig,
        web_identity_token: &SecretString,
    ) -> Result<Vec<u8>, StoreError> {
        let request = WebIdentityRequest {
            role_arn: location.role_arn.clone(),
            session_name: self.session_name.clone(),
            duration_seconds: None,
        };

        let creds = self
            .refresher
            .refresh(|| self.sts.assume_role_with_web_identity(&request, web_identity_token))
            .await?;

        debug!(
            bucket = %location.mapping_bucket,
            key = %location.mapping_key,
            "Fetching mapping document"
        );

        let fetch_error = |message: String| StoreError::Fetch {
            bucket: location.mapping_bucket.clone(),
            key: location.mapping_key.clone(),
            message,
        };

        let object = self
            .client(&creds)
            .get_object()
            .bucket(&location.mapping_bucket)
            .key(&location.mapping_key)
            .send()
            .await
            .map_err(|e| fetch_error(DisplayErrorContext(&e).to_string()))?;

        let body = object
            .body
            .collect()
            .await
            .map_err(|e| fetch_error(e.to_string()))?
            .into_bytes();

        info!(
            bucket = %location.mapping_bucket,
            key = %location.mapping_key,
            bytes = body.len(),
            "Fetched mapping document"
        );
        Ok(body.to_vec())
    }
}
