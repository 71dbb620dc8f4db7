//! SDK and runner configuration.
//!
//! [`SdkConfiguration`] is what embedding code builds; [`Config::from_env`]
//! loads the same settings from environment variables for the CLI, failing
//! fast on anything missing or malformed. The SDK key is wrapped in
//! `secrecy::SecretString` so it never shows up in logs.

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{ANDROID_TAG, PHONE_TAG, TABLET_TAG};

/// Form factor reported through the automatic device tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    #[default]
    Phone,
    Tablet,
}

impl DeviceClass {
    pub fn tag(self) -> &'static str {
        match self {
            DeviceClass::Phone => PHONE_TAG,
            DeviceClass::Tablet => TABLET_TAG,
        }
    }
}

impl std::str::FromStr for DeviceClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "phone" => Ok(DeviceClass::Phone),
            "tablet" => Ok(DeviceClass::Tablet),
            other => Err(Error::Config(format!("unknown device class: {other}"))),
        }
    }
}

#[derive(Debug)]
pub struct SdkConfiguration {
    /// Key half of the `key-shard` SDK key.
    pub sdk_key: SecretString,
    /// Data-center shard, the part after the dash.
    pub shard: String,
    pub debug_mode: bool,
    pub auto_tagging: bool,
    pub device_class: DeviceClass,
    pub platform_tag: String,
    pub base_url: String,
}

impl SdkConfiguration {
    pub fn builder(sdk_key: impl Into<String>) -> SdkConfigurationBuilder {
        SdkConfigurationBuilder {
            sdk_key: sdk_key.into(),
            debug_mode: false,
            auto_tagging: true,
            device_class: DeviceClass::default(),
            platform_tag: ANDROID_TAG.to_string(),
            base_url: None,
        }
    }
}

pub struct SdkConfigurationBuilder {
    sdk_key: String,
    debug_mode: bool,
    auto_tagging: bool,
    device_class: DeviceClass,
    platform_tag: String,
    base_url: Option<String>,
}

impl SdkConfigurationBuilder {
    /// Extra logging. Off by default.
    pub fn debug_mode(mut self, enabled: bool) -> Self {
        self.debug_mode = enabled;
        self
    }

    /// Tag created or updated contacts with platform and device class. On by default.
    pub fn auto_tagging(mut self, enabled: bool) -> Self {
        self.auto_tagging = enabled;
        self
    }

    pub fn device_class(mut self, device_class: DeviceClass) -> Self {
        self.device_class = device_class;
        self
    }

    pub fn platform_tag(mut self, tag: impl Into<String>) -> Self {
        self.platform_tag = tag.into();
        self
    }

    /// Override the API root, e.g. to point at a local mock server.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Split the key into key and shard.
    ///
    /// # Errors
    ///
    /// `Error::Config` unless the key contains exactly one dash with
    /// non-empty halves.
    pub fn build(self) -> Result<SdkConfiguration> {
        let (key, shard) = match self.sdk_key.split('-').collect::<Vec<_>>().as_slice() {
            [key, shard] if !key.is_empty() && !shard.is_empty() => {
                (key.to_string(), shard.to_string())
            }
            _ => {
                return Err(Error::Config(
                    "the provided SDK key is invalid, it should contain 1 dash".to_string(),
                ));
            }
        };

        let base_url = self.base_url.unwrap_or_else(|| default_base_url(&shard));

        Ok(SdkConfiguration {
            sdk_key: SecretString::from(key),
            shard,
            debug_mode: self.debug_mode,
            auto_tagging: self.auto_tagging,
            device_class: self.device_class,
            platform_tag: self.platform_tag,
            base_url,
        })
    }
}

/// API root for a data-center shard.
pub fn default_base_url(shard: &str) -> String {
    format!("https://{shard}.api.mailchimp.com/3.0/sdk")
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Config {
    pub sdk: SdkConfiguration,
    /// Enables durable job persistence when set.
    pub database_url: Option<SecretString>,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let mut sdk = SdkConfiguration::builder(required_var("AUDIENCE_SDK_KEY")?);
        if let Ok(url) = std::env::var("AUDIENCE_BASE_URL") {
            sdk = sdk.base_url(url);
        }
        if let Some(debug) = bool_var("AUDIENCE_DEBUG")? {
            sdk = sdk.debug_mode(debug);
        }
        if let Some(auto_tagging) = bool_var("AUDIENCE_AUTO_TAGGING")? {
            sdk = sdk.auto_tagging(auto_tagging);
        }
        if let Ok(device_class) = std::env::var("AUDIENCE_DEVICE_CLASS") {
            sdk = sdk.device_class(device_class.parse()?);
        }

        Ok(Self {
            sdk: sdk.build()?,
            database_url: std::env::var("DATABASE_URL").ok().map(SecretString::from),
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}

fn bool_var(name: &str) -> Result<Option<bool>> {
    match std::env::var(name) {
        Ok(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            other => Err(Error::Config(format!("{name} is not a boolean: {other}"))),
        },
        Err(_) => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Tuning for [`LocalJobRunner`](crate::runner::LocalJobRunner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Upper bound on attempts running at once across all chains.
    pub max_concurrent: usize,
    /// An attempt still running after this long counts as a retry.
    pub attempt_timeout_secs: u64,
    /// Cap on any single backoff delay.
    pub max_backoff_secs: u64,
    /// Finished jobs younger than this survive `prune`.
    pub retention_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            attempt_timeout_secs: 10 * 60,
            max_backoff_secs: 5 * 60 * 60,
            retention_secs: 24 * 60 * 60,
        }
    }
}

impl RunnerConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| Error::Config(format!("invalid runner config {}: {e}", path.display())))
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}
