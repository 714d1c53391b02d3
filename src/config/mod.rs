//! Configuration for pipeline-roles
//!
//! Two sources:
//! - the bootstrap config, a JSON object passed as the `config` input
//! - optional settings, a TOML file overriding the fixed defaults

mod types;

pub use types::*;

use crate::retry::{RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_RETRIES};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs;

/// Region handed to the credential step
pub const DEFAULT_REGION: &str = "eu-central-1";

/// Lifetime of the assumed role session
pub const DEFAULT_ROLE_DURATION_SECONDS: u32 = 3600;

/// Audience of the identity token
pub const DEFAULT_AUDIENCE: &str = "sts.amazonaws.com";

/// Session name used while reading the mapping document
pub const DEFAULT_BOOTSTRAP_SESSION_NAME: &str = "prepare-pipeline";

/// Session name of the assumed target role
pub const DEFAULT_SESSION_NAME: &str = "GitHubActions";

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Where the mapping document lives and which role may read it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapConfig {
    pub role_arn: String,
    pub mapping_bucket: String,
    pub mapping_key: String,
}

impl BootstrapConfig {
    /// Parse the JSON `config` input. Every field is required and must be
    /// non-empty.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Raw {
            role_arn: Option<String>,
            mapping_bucket: Option<String>,
            mapping_key: Option<String>,
        }

        let raw: Raw =
            serde_json::from_str(input).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        match (raw.role_arn, raw.mapping_bucket, raw.mapping_key) {
            (Some(role_arn), Some(mapping_bucket), Some(mapping_key))
                if !role_arn.is_empty() && !mapping_bucket.is_empty() && !mapping_key.is_empty() =>
            {
                Ok(Self {
                    role_arn,
                    mapping_bucket,
                    mapping_key,
                })
            }
            _ => Err(ConfigError::Invalid(
                "roleArn, mappingBucket or mappingKey is not specified in config".to_string(),
            )),
        }
    }
}

/// Tunables of a run, defaulting to the fixed action parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub aws: AwsSettings,
    pub retry: RetryPolicy,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Load settings from a TOML file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Load settings from a string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let raw: RawSettings =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawSettings) -> Result<Self, ConfigError> {
        Ok(Self {
            aws: raw.aws.unwrap_or_default().try_into()?,
            retry: raw.retry.unwrap_or_default().into(),
            logging: raw.logging.unwrap_or_default().try_into()?,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            aws: AwsSettings::default(),
            retry: RetryPolicy::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Parameters of the AWS side of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsSettings {
    pub region: String,
    /// Region of the mapping bucket, defaults to `region`
    pub mapping_region: Option<String>,
    pub role_duration_seconds: u32,
    pub mask_account_id: bool,
    pub audience: String,
    pub bootstrap_session_name: String,
    pub session_name: String,
}

impl Default for AwsSettings {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            mapping_region: None,
            role_duration_seconds: DEFAULT_ROLE_DURATION_SECONDS,
            mask_account_id: false,
            audience: DEFAULT_AUDIENCE.to_string(),
            bootstrap_session_name: DEFAULT_BOOTSTRAP_SESSION_NAME.to_string(),
            session_name: DEFAULT_SESSION_NAME.to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Format: "json" or "pretty"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format
    Pretty,
    /// JSON format
    Json,
}

fn retry_policy(max_retries: Option<u32>, base_delay_ms: Option<u64>) -> RetryPolicy {
    RetryPolicy::new(
        max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
        base_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_BASE_DELAY),
    )
}
