use std::time::Duration;

use audience_rs::config::{Config, DeviceClass, RunnerConfig, SdkConfiguration, default_base_url};
use audience_rs::error::Error;
use audience_rs::model::{ANDROID_TAG, PHONE_TAG, TABLET_TAG};
use secrecy::ExposeSecret;

#[test]
fn sdk_key_splits_into_key_and_shard() {
    let config = SdkConfiguration::builder("abc123-us7").build().unwrap();
    assert_eq!(config.sdk_key.expose_secret(), "abc123");
    assert_eq!(config.shard, "us7");
    assert_eq!(config.base_url, default_base_url("us7"));
}

#[test]
fn sdk_key_needs_exactly_one_dash() {
    for key in ["nodash", "two-da-shes", "-us1", "key-", ""] {
        let result = SdkConfiguration::builder(key).build();
        assert!(
            matches!(result, Err(Error::Config(_))),
            "{key:?} should be rejected"
        );
    }
}

#[test]
fn builder_defaults() {
    let config = SdkConfiguration::builder("k-us1").build().unwrap();
    assert!(!config.debug_mode);
    assert!(config.auto_tagging);
    assert_eq!(config.device_class, DeviceClass::Phone);
    assert_eq!(config.platform_tag, ANDROID_TAG);
}

#[test]
fn builder_overrides() {
    let config = SdkConfiguration::builder("k-us1")
        .debug_mode(true)
        .auto_tagging(false)
        .device_class(DeviceClass::Tablet)
        .platform_tag("iOS")
        .base_url("http://localhost:8080")
        .build()
        .unwrap();
    assert!(config.debug_mode);
    assert!(!config.auto_tagging);
    assert_eq!(config.device_class.tag(), TABLET_TAG);
    assert_eq!(config.platform_tag, "iOS");
    assert_eq!(config.base_url, "http://localhost:8080");
}

#[test]
fn device_class_parses_case_insensitively() {
    assert_eq!("Tablet".parse::<DeviceClass>().unwrap(), DeviceClass::Tablet);
    assert_eq!("phone".parse::<DeviceClass>().unwrap().tag(), PHONE_TAG);
    assert!("watch".parse::<DeviceClass>().is_err());
}

// All environment manipulation lives in one test; the process environment is shared.
#[test]
fn config_from_env() {
    unsafe {
        std::env::remove_var("AUDIENCE_SDK_KEY");
    }
    assert!(matches!(Config::from_env(), Err(Error::Config(_))));

    unsafe {
        std::env::set_var("AUDIENCE_SDK_KEY", "envkey-us3");
        std::env::set_var("AUDIENCE_AUTO_TAGGING", "off");
        std::env::set_var("AUDIENCE_DEVICE_CLASS", "tablet");
        std::env::remove_var("AUDIENCE_BASE_URL");
        std::env::remove_var("DATABASE_URL");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.sdk.shard, "us3");
    assert!(!config.sdk.auto_tagging);
    assert_eq!(config.sdk.device_class, DeviceClass::Tablet);
    assert!(config.database_url.is_none());
    assert!(!config.log_level.is_empty());

    unsafe {
        std::env::set_var("AUDIENCE_DEBUG", "maybe");
    }
    assert!(matches!(Config::from_env(), Err(Error::Config(_))));

    unsafe {
        std::env::remove_var("AUDIENCE_SDK_KEY");
        std::env::remove_var("AUDIENCE_AUTO_TAGGING");
        std::env::remove_var("AUDIENCE_DEVICE_CLASS");
        std::env::remove_var("AUDIENCE_DEBUG");
    }
}

#[test]
fn runner_config_defaults() {
    let config = RunnerConfig::default();
    assert_eq!(config.attempt_timeout(), Duration::from_secs(600));
    assert_eq!(config.max_backoff(), Duration::from_secs(5 * 60 * 60));
    assert_eq!(config.retention(), Duration::from_secs(24 * 60 * 60));
}

#[test]
fn runner_config_from_partial_toml() {
    let path = std::env::temp_dir().join(format!("runner-{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(&path, "max_concurrent = 1\nretention_secs = 60\n").unwrap();

    let config = RunnerConfig::from_toml_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(config.max_concurrent, 1);
    assert_eq!(config.retention(), Duration::from_secs(60));
    assert_eq!(config.attempt_timeout_secs, RunnerConfig::default().attempt_timeout_secs);
}

#[test]
fn runner_config_rejects_bad_toml() {
    let path = std::env::temp_dir().join(format!("runner-{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(&path, "max_concurrent = \"many\"\n").unwrap();

    let result = RunnerConfig::from_toml_file(&path);
    std::fs::remove_file(&path).unwrap();
    assert!(matches!(result, Err(Error::Config(_))));
}
