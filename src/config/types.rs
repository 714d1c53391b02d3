//! Raw settings types for TOML parsing

use super::*;

/// STS bounds on role session duration
const MIN_ROLE_DURATION_SECONDS: u32 = 900;
const MAX_ROLE_DURATION_SECONDS: u32 = 43200;

/// Raw settings as parsed from TOML
#[derive(Debug, Deserialize, Default)]
pub struct RawSettings {
    pub aws: Option<RawAwsSettings>,
    pub retry: Option<RawRetrySettings>,
    pub logging: Option<RawLoggingConfig>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawAwsSettings {
    pub region: Option<String>,
    pub mapping_region: Option<String>,
    pub role_duration_seconds: Option<u32>,
    pub mask_account_id: Option<bool>,
    pub audience: Option<String>,
    pub bootstrap_session_name: Option<String>,
    pub session_name: Option<String>,
}

impl TryFrom<RawAwsSettings> for AwsSettings {
    type Error = ConfigError;

    fn try_from(raw: RawAwsSettings) -> Result<Self, Self::Error> {
        let defaults = AwsSettings::default();

        let role_duration_seconds = raw
            .role_duration_seconds
            .unwrap_or(defaults.role_duration_seconds);
        if !(MIN_ROLE_DURATION_SECONDS..=MAX_ROLE_DURATION_SECONDS).contains(&role_duration_seconds)
        {
            return Err(ConfigError::Invalid(format!(
                "role_duration_seconds must be between {} and {}, got {}",
                MIN_ROLE_DURATION_SECONDS, MAX_ROLE_DURATION_SECONDS, role_duration_seconds
            )));
        }

        let region = raw.region.unwrap_or(defaults.region);
        if region.is_empty() {
            return Err(ConfigError::Invalid("region must not be empty".to_string()));
        }

        Ok(Self {
            region,
            mapping_region: raw.mapping_region,
            role_duration_seconds,
            mask_account_id: raw.mask_account_id.unwrap_or(defaults.mask_account_id),
            audience: raw.audience.unwrap_or(defaults.audience),
            bootstrap_session_name: raw
                .bootstrap_session_name
                .unwrap_or(defaults.bootstrap_session_name),
            session_name: raw.session_name.unwrap_or(defaults.session_name),
        })
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RawRetrySettings {
    pub max_retries: Option<u32>,
    pub base_delay_ms: Option<u64>,
}

impl From<RawRetrySettings> for RetryPolicy {
    fn from(raw: RawRetrySettings) -> Self {
        retry_policy(raw.max_retries, raw.base_delay_ms)
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RawLoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
}

impl TryFrom<RawLoggingConfig> for LoggingConfig {
    type Error = ConfigError;

    fn try_from(raw: RawLoggingConfig) -> Result<Self, Self::Error> {
        let format = match raw.format.as_deref() {
            Some("pretty") | None => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown log format: {}",
                    other
                )))
            }
        };

        Ok(Self {
            level: raw.level.unwrap_or_else(|| "info".to_string()),
            format,
        })
    }
}
